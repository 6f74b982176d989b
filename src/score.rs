//! Running score for one session

use crate::platform::ScoreSink;
use crate::sim::ScoreEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreBoard {
    score: u64,
    kills: u32,
    waves_cleared: u32,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn waves_cleared(&self) -> u32 {
        self.waves_cleared
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl ScoreSink for ScoreBoard {
    fn add_points(&mut self, amount: u64, event: ScoreEvent) {
        self.score = self.score.saturating_add(amount);
        match event {
            ScoreEvent::EnemyKilled => self.kills += 1,
            ScoreEvent::WaveCleared => self.waves_cleared += 1,
        }
        log::trace!("+{} ({})", amount, event.as_str());
    }

    fn current_score(&self) -> u64 {
        self.score
    }
}
