//! Sprite and sound load tracking
//!
//! Loading happens outside the fixed update. The simulation never waits on
//! it: entities whose sprite is not ready are simply not drawn, and sounds
//! that are not ready are not played.

use std::collections::BTreeMap;

use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetKind {
    Sprite,
    Sound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetState {
    Loading,
    Ready,
    /// Permanently skipped
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: BTreeMap<String, (AssetKind, AssetState)>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset as loading. Already known ids keep their state.
    pub fn request(&mut self, id: &str, kind: AssetKind) {
        self.assets
            .entry(id.to_string())
            .or_insert((kind, AssetState::Loading));
    }

    /// Complete a load. Results for ids nobody requested are discarded.
    pub fn mark_ready(&mut self, id: &str) -> bool {
        match self.assets.get_mut(id) {
            Some((_, state)) => {
                *state = AssetState::Ready;
                true
            }
            None => {
                log::debug!("Discarding load result for unknown asset `{}`", id);
                false
            }
        }
    }

    /// Record a failed load and return the error for reporting
    pub fn mark_failed(&mut self, id: &str, reason: impl Into<String>) -> SimError {
        let reason = reason.into();
        let error = SimError::ResourceLoadFailure {
            id: id.to_string(),
            reason: reason.clone(),
        };
        log::warn!("{}", error);
        if let Some((_, state)) = self.assets.get_mut(id) {
            *state = AssetState::Failed(reason);
        }
        error
    }

    pub fn state(&self, id: &str) -> Option<&AssetState> {
        self.assets.get(id).map(|(_, state)| state)
    }

    pub fn is_ready(&self, id: &str) -> bool {
        matches!(self.state(id), Some(AssetState::Ready))
    }

    /// Ids still loading, in id order
    pub fn pending(&self) -> Vec<&str> {
        self.assets
            .iter()
            .filter(|(_, (_, state))| *state == AssetState::Loading)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn count(&self, kind: AssetKind) -> usize {
        self.assets.values().filter(|(k, _)| *k == kind).count()
    }
}
