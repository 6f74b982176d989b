//! Fixed-slot object pool with generational handles
//!
//! Instances live in a pre-allocated arena. A slot index is either on the free
//! list or in the active list, never both. Released slots are reset to
//! `T::default()` and their generation is bumped, so stale handles held by
//! callers simply stop resolving.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// What `acquire` does when the free list is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolPolicy {
    /// Allocate a new slot; the pool grows without bound
    Grow,
    /// Fail with `PoolExhausted`; the caller skips the spawn
    #[default]
    Bounded,
}

/// Reference to a pooled instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    generation: u32,
    live: bool,
}

#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    /// Live slot indices, oldest acquisition first
    active: Vec<u32>,
    policy: PoolPolicy,
}

impl<T: Default> Pool<T> {
    /// Pre-populate `capacity` default instances
    pub fn with_capacity(capacity: usize, policy: PoolPolicy) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                value: T::default(),
                generation: 0,
                live: false,
            })
            .collect();
        // Reversed so the lowest index is handed out first
        let free = (0..capacity as u32).rev().collect();
        Self {
            slots,
            free,
            active: Vec::with_capacity(capacity),
            policy,
        }
    }

    pub fn policy(&self) -> PoolPolicy {
        self.policy
    }

    /// Total slots (free + active)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Move a free instance to the active set. The instance is in its
    /// default state.
    pub fn acquire(&mut self) -> Result<Handle, SimError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => match self.policy {
                PoolPolicy::Grow => {
                    let index = self.slots.len() as u32;
                    self.slots.push(Slot {
                        value: T::default(),
                        generation: 0,
                        live: false,
                    });
                    log::debug!("Pool grew to {} slots", self.slots.len());
                    index
                }
                PoolPolicy::Bounded => {
                    return Err(SimError::PoolExhausted {
                        capacity: self.slots.len(),
                    });
                }
            },
        };

        let slot = &mut self.slots[index as usize];
        slot.live = true;
        self.active.push(index);
        Ok(Handle {
            index,
            generation: slot.generation,
        })
    }

    /// Acquire and initialize in one call
    pub fn acquire_with(&mut self, init: impl FnOnce(&mut T)) -> Result<Handle, SimError> {
        let handle = self.acquire()?;
        if let Some(value) = self.get_mut(handle) {
            init(value);
        }
        Ok(handle)
    }

    /// Reset the instance and return it to the free list.
    ///
    /// Returns `false` (and does nothing) if the handle is not currently
    /// active, including handles that were already released.
    pub fn release(&mut self, handle: Handle) -> bool {
        if !self.is_active(handle) {
            return false;
        }
        let slot = &mut self.slots[handle.index()];
        slot.value = T::default();
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);

        if let Some(pos) = self.active.iter().position(|&i| i == handle.index) {
            self.active.remove(pos);
        }
        self.free.push(handle.index);
        true
    }

    /// Release every active instance
    pub fn release_all(&mut self) {
        for handle in self.active_handles() {
            self.release(handle);
        }
    }

    /// Release every active instance for which `keep` returns false.
    /// Returns the number released.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let doomed: Vec<Handle> = self
            .iter_active()
            .filter(|&(_, value)| !keep(value))
            .map(|(handle, _)| handle)
            .collect();
        doomed.into_iter().filter(|&h| self.release(h)).count()
    }
}

impl<T> Pool<T> {
    pub fn is_active(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.index())
            .is_some_and(|s| s.live && s.generation == handle.generation)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|s| s.live && s.generation == handle.generation)
            .map(|s| &s.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.live && s.generation == handle.generation)
            .map(|s| &mut s.value)
    }

    fn handle_at(&self, index: u32) -> Handle {
        Handle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Snapshot of active handles, oldest first
    pub fn active_handles(&self) -> Vec<Handle> {
        self.active.iter().map(|&i| self.handle_at(i)).collect()
    }

    /// Active instances, oldest first
    pub fn iter_active(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.active
            .iter()
            .map(move |&i| (self.handle_at(i), &self.slots[i as usize].value))
    }
}
