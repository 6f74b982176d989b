//! Wave/spawn state machine
//!
//! `Idle -> Active -> Completed -> Active (next wave) ...`, with `Errored` as
//! an absorbing failure state. The scheduler owns every live enemy; the world
//! reports deaths back through `on_entity_destroyed`.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::entity::{Enemy, EntityId, Lifecycle};
use super::geometry::Rect;
use super::patterns::Shot;
use super::waves::{EnemyTemplate, WaveConfig, WaveTable};
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavePhase {
    /// No wave started yet in this session
    #[default]
    Idle,
    Active,
    /// Last wave finished; `start_wave` moves on to the next one
    Completed,
    /// Terminal until `reset`
    Errored,
}

/// Notifications produced by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum WaveEvent {
    Started { wave: u32 },
    Spawned { wave: u32, id: EntityId },
    Completed { wave: u32 },
    Failed { wave: u32, error: SimError },
}

/// Runtime state for the current wave plus the enemies it spawned
#[derive(Debug, Clone)]
pub struct WaveScheduler {
    table: WaveTable,
    field: Rect,
    phase: WavePhase,
    wave_number: u32,
    /// Configuration of the running wave
    config: Option<WaveConfig>,
    spawned: u32,
    remaining: u32,
    spawn_timer_ms: f64,
    /// Live enemies in spawn order
    enemies: Vec<Enemy>,
    next_id: u32,
    rng: Pcg32,
    events: Vec<WaveEvent>,
}

impl WaveScheduler {
    pub fn new(table: WaveTable, field: Rect, seed: u64) -> Self {
        Self {
            table,
            field,
            phase: WavePhase::Idle,
            wave_number: 0,
            config: None,
            spawned: 0,
            remaining: 0,
            spawn_timer_ms: 0.0,
            enemies: Vec::new(),
            // Id 0 belongs to the player
            next_id: 1,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
        }
    }

    /// Back to `Idle` at wave 0 for a new session
    pub fn reset(&mut self, seed: u64) {
        let table = std::mem::take(&mut self.table);
        *self = Self::new(table, self.field, seed);
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn wave_number(&self) -> u32 {
        self.wave_number
    }

    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn table(&self) -> &WaveTable {
        &self.table
    }

    /// Whether a configuration exists for the wave after the current one
    pub fn has_next_wave(&self) -> bool {
        self.table.contains(self.wave_number + 1)
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn enemies_mut(&mut self) -> &mut [Enemy] {
        &mut self.enemies
    }

    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    /// Advance to the next wave number and start it
    pub fn start_wave(&mut self) -> Result<u32, SimError> {
        match self.phase {
            WavePhase::Errored => return Err(SimError::SchedulerErrored),
            WavePhase::Active => {
                return Err(SimError::WaveActive {
                    wave: self.wave_number,
                });
            }
            WavePhase::Idle | WavePhase::Completed => {}
        }

        self.wave_number += 1;
        let wave = self.wave_number;
        let config = match self.table.get(wave) {
            Ok(config) => config.clone(),
            Err(e) => {
                self.fail(e.clone());
                return Err(e);
            }
        };

        self.spawned = 0;
        self.remaining = config.enemy_count;
        self.spawn_timer_ms = 0.0;
        self.config = Some(config);
        self.phase = WavePhase::Active;
        self.events.push(WaveEvent::Started { wave });
        log::info!("Wave {} started ({} enemies)", wave, self.remaining);
        Ok(wave)
    }

    /// Advance spawn timing and check for completion. Returns every event
    /// raised since the last call, including those from `start_wave`.
    pub fn update(&mut self, dt_ms: f64) -> Vec<WaveEvent> {
        if self.phase == WavePhase::Active {
            if let Err(e) = self.update_active(dt_ms) {
                self.fail(e);
            }
        }
        std::mem::take(&mut self.events)
    }

    fn update_active(&mut self, dt_ms: f64) -> Result<(), SimError> {
        let Some(config) = &self.config else {
            return Err(SimError::ConfigMissing {
                wave: self.wave_number,
            });
        };

        self.spawn_timer_ms += dt_ms;
        if self.spawned < config.enemy_count {
            let delay = if config.spawn_points.is_empty() {
                0.0
            } else {
                config.spawn_points[self.spawned as usize % config.spawn_points.len()].delay_ms
            };
            if self.spawn_timer_ms >= config.spawn_interval_ms + delay {
                let id = self.spawn_one()?;
                self.spawn_timer_ms = 0.0;
                self.events.push(WaveEvent::Spawned {
                    wave: self.wave_number,
                    id,
                });
            }
        }

        if self.remaining == 0 && self.enemies.is_empty() {
            self.phase = WavePhase::Completed;
            self.config = None;
            self.events.push(WaveEvent::Completed {
                wave: self.wave_number,
            });
            log::info!("Wave {} completed", self.wave_number);
        }
        Ok(())
    }

    fn spawn_one(&mut self) -> Result<EntityId, SimError> {
        let config = self.config.as_ref().ok_or(SimError::ConfigMissing {
            wave: self.wave_number,
        })?;
        if config.enemies.is_empty() {
            return Err(SimError::InvalidConfig(format!(
                "wave {} has no enemy templates",
                config.id
            )));
        }

        let template: &EnemyTemplate = &config.enemies[self.rng.random_range(0..config.enemies.len())];
        let pos = if config.spawn_points.is_empty() {
            Vec2::new(
                self.field.x + self.field.width * self.rng.random_range(0.1..0.9),
                self.field.y,
            )
        } else {
            let point = &config.spawn_points[self.spawned as usize % config.spawn_points.len()];
            Vec2::new(
                self.field.x + point.x * self.field.width,
                self.field.y + point.y * self.field.height,
            )
        };

        let id = EntityId(self.next_id);
        self.next_id += 1;
        let enemy = Enemy {
            id,
            kind: template.name.clone(),
            pos,
            prev_pos: pos,
            vel: Vec2::ZERO,
            shape: template.shape,
            health: template.health,
            score_value: template.score_value,
            movement: template.movement.clone(),
            shooting: template.shooting,
            fire_interval_ms: template.fire_interval_ms,
            fire_timer_ms: 0.0,
            age: 0.0,
            lifecycle: Lifecycle::Active,
        };
        log::debug!("Spawned {} `{}` at {:?}", id.0, enemy.kind, pos);
        self.enemies.push(enemy);
        self.spawned += 1;
        Ok(id)
    }

    /// Move every enemy and collect the shots fired this tick.
    /// `time_s` is global simulation time, used by time-driven shot patterns.
    pub fn advance_enemies(&mut self, dt_ms: f64, target: Vec2, time_s: f32) -> Vec<(EntityId, Shot)> {
        let dt = (dt_ms / 1000.0) as f32;
        let mut shots = Vec::new();
        for enemy in self.enemies.iter_mut().filter(|e| e.is_active()) {
            enemy.advance(dt);
            if enemy.ready_to_fire(dt_ms) {
                if let Some(pattern) = &enemy.shooting {
                    shots.extend(
                        pattern
                            .fire(enemy.pos, target, time_s)
                            .into_iter()
                            .map(|shot| (enemy.id, shot)),
                    );
                }
            }
        }
        shots
    }

    /// Stop tracking an enemy. Returns `false` for ids that are not tracked.
    pub fn on_entity_destroyed(&mut self, id: EntityId) -> bool {
        let Some(index) = self.enemies.iter().position(|e| e.id == id) else {
            return false;
        };
        self.enemies.remove(index);
        self.remaining = self.remaining.saturating_sub(1);
        true
    }

    fn fail(&mut self, error: SimError) {
        log::error!("Wave {} failed: {}", self.wave_number, error);
        self.phase = WavePhase::Errored;
        self.config = None;
        self.enemies.clear();
        self.events.push(WaveEvent::Failed {
            wave: self.wave_number,
            error,
        });
    }
}
