//! High score leaderboard
//!
//! Keeps the top 10 scores and persists them as JSON through a
//! `KeyValueStore`.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::persistence::{KeyValueStore, load_json, save_json};
use crate::platform::{PersistenceSink, now_ms};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    /// Wave reached
    pub wave: u32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

/// Scores sorted descending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub const STORAGE_KEY: &'static str = "star_strike_highscores";

    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Rank a score would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert a score if it qualifies. Returns the rank achieved.
    pub fn add_score(&mut self, score: u64, wave: u32, timestamp: f64) -> Option<usize> {
        let rank = self.potential_rank(score)?;
        self.entries.insert(
            rank - 1,
            HighScoreEntry {
                score,
                wave,
                timestamp,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load from the store, starting fresh on any failure
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match load_json::<HighScores>(store, Self::STORAGE_KEY) {
            Ok(Some(mut scores)) => {
                scores.entries.sort_by(|a, b| b.score.cmp(&a.score));
                scores.entries.truncate(MAX_HIGH_SCORES);
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Ok(None) => {
                log::info!("No high scores found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Could not read high scores ({}), starting fresh", e);
                Self::new()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        save_json(store, Self::STORAGE_KEY, self)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// Leaderboard bound to its backing store
#[derive(Debug)]
pub struct Leaderboard<S> {
    store: S,
    scores: HighScores,
}

impl<S: KeyValueStore> Leaderboard<S> {
    pub fn open(store: S) -> Self {
        let scores = HighScores::load(&store);
        Self { store, scores }
    }

    pub fn scores(&self) -> &HighScores {
        &self.scores
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a finished run. Returns the rank if it made the board.
    pub fn record(&mut self, score: u64, wave: u32, timestamp: f64) -> Option<usize> {
        let rank = self.scores.add_score(score, wave, timestamp)?;
        if let Err(e) = self.scores.save(&mut self.store) {
            log::warn!("High score save skipped: {}", e);
        }
        Some(rank)
    }
}

impl<S: KeyValueStore> PersistenceSink for Leaderboard<S> {
    fn load_high_score(&self) -> u64 {
        self.scores.top_score().unwrap_or(0)
    }

    fn save_high_score(&mut self, score: u64, wave: u32) {
        if let Some(rank) = self.record(score, wave, now_ms()) {
            log::info!("New high score #{}: {} (wave {})", rank, score, wave);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_ranking_and_truncation() {
        let mut scores = HighScores::new();
        assert!(!scores.qualifies(0));
        for s in 1..=12u64 {
            scores.add_score(s * 100, 1, 0.0);
        }
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.top_score(), Some(1200));
        assert_eq!(scores.entries.last().map(|e| e.score), Some(300));

        assert!(!scores.qualifies(300));
        assert_eq!(scores.potential_rank(301), Some(10));
        assert_eq!(scores.add_score(1250, 4, 0.0), Some(1));
    }

    #[test]
    fn test_equal_score_ranks_after_existing() {
        let mut scores = HighScores::new();
        scores.add_score(500, 1, 1.0);
        assert_eq!(scores.add_score(500, 2, 2.0), Some(2));
        assert_eq!(scores.entries[0].wave, 1);
    }

    #[test]
    fn test_leaderboard_persists() {
        let mut board = Leaderboard::open(MemoryStore::new());
        assert_eq!(board.load_high_score(), 0);
        board.save_high_score(900, 3);
        board.save_high_score(400, 2);

        let reopened = Leaderboard::open(board.store().clone());
        assert_eq!(reopened.load_high_score(), 900);
        assert_eq!(reopened.scores().entries.len(), 2);
    }

    #[test]
    fn test_leaderboard_survives_broken_store() {
        let mut board = Leaderboard::open(MemoryStore::unavailable());
        assert_eq!(board.load_high_score(), 0);
        // Save fails internally but the score is still kept for this session
        board.save_high_score(700, 5);
        assert_eq!(board.load_high_score(), 700);
    }

    #[test]
    fn test_corrupt_scores_start_fresh() {
        let mut store = MemoryStore::new();
        store.set(HighScores::STORAGE_KEY, "oops").unwrap();
        assert!(HighScores::load(&store).is_empty());
    }
}
