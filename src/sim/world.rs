//! One fixed simulation step over the whole game world
//!
//! Every step runs in the same order: input, wave scheduler, entity movement,
//! collision, then scoring and cleanup. Anything the outside world should hear
//! about is returned as a `GameEvent` list; the world never calls out.

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;

use super::collision::{Body, CollisionResolver};
use super::entity::{EntityId, EntityRef, Faction, Lifecycle, Player, Projectile};
use super::geometry::Rect;
use super::patterns::Shot;
use super::pool::{Handle, Pool, PoolPolicy};
use super::scheduler::{WaveEvent, WavePhase, WaveScheduler};
use super::waves::WaveTable;
use crate::consts::*;
use crate::error::SimError;
use crate::sounds;

/// Input commands for a single step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Desired movement, each component in [-1, 1]
    pub movement: Vec2,
    pub fire: bool,
    /// Pause toggle (acts on the press, not while held)
    pub pause: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Playing,
    Paused,
    /// Short pause between a cleared wave and the next one
    Breather,
    GameOver,
    /// Every configured wave cleared
    Victory,
    /// The wave scheduler failed; the session cannot continue
    Halted,
}

impl SessionPhase {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            SessionPhase::GameOver | SessionPhase::Victory | SessionPhase::Halted
        )
    }
}

/// Why points were awarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    EnemyKilled,
    WaveCleared,
}

impl ScoreEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreEvent::EnemyKilled => "enemy_killed",
            ScoreEvent::WaveCleared => "wave_cleared",
        }
    }
}

/// Messages produced by a step
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Sound(&'static str),
    Points { amount: u64, event: ScoreEvent },
    Wave(WaveEvent),
    PlayerHit { health: u32 },
    EnemyDestroyed { id: EntityId, pos: Vec2 },
    /// A projectile could not be spawned this step
    SpawnSkipped { error: SimError },
    PhaseChanged { phase: SessionPhase },
}

/// Construction parameters for a `World`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub field: Rect,
    pub pool_capacity: usize,
    pub pool_policy: PoolPolicy,
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            field: Rect::new(0.0, 0.0, PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT),
            pool_capacity: DEFAULT_POOL_SIZE,
            pool_policy: PoolPolicy::default(),
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct World {
    field: Rect,
    player: Player,
    scheduler: WaveScheduler,
    projectiles: Pool<Projectile>,
    resolver: CollisionResolver,
    bodies: Vec<Body<EntityRef>>,
    time_ms: f64,
    phase: SessionPhase,
    /// Phase to return to when unpausing
    resume_phase: SessionPhase,
    breather_ms: f64,
    pause_held: bool,
}

impl World {
    /// Create a world and start wave 1
    pub fn new(table: WaveTable, config: WorldConfig) -> Self {
        let field = config.field;
        let mut world = Self {
            field,
            player: Player::new(Self::player_start(&field)),
            scheduler: WaveScheduler::new(table, field, config.seed),
            projectiles: Pool::with_capacity(config.pool_capacity, config.pool_policy),
            resolver: CollisionResolver::new(field.expanded(ENEMY_ESCAPE_MARGIN)),
            bodies: Vec::new(),
            time_ms: 0.0,
            phase: SessionPhase::Playing,
            resume_phase: SessionPhase::Playing,
            breather_ms: 0.0,
            pause_held: false,
        };
        // A failure here is reported by the first step
        let _ = world.scheduler.start_wave();
        world
    }

    /// Start a new session on the same wave table
    pub fn reset(&mut self, seed: u64) {
        self.player = Player::new(Self::player_start(&self.field));
        self.scheduler.reset(seed);
        self.projectiles.release_all();
        self.time_ms = 0.0;
        self.phase = SessionPhase::Playing;
        self.resume_phase = SessionPhase::Playing;
        self.breather_ms = 0.0;
        self.pause_held = false;
        let _ = self.scheduler.start_wave();
    }

    fn player_start(field: &Rect) -> Vec2 {
        Vec2::new(field.center().x, field.bottom() - PLAYER_START_OFFSET)
    }

    pub fn field(&self) -> Rect {
        self.field
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Simulated time in milliseconds (excludes paused time)
    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn wave(&self) -> u32 {
        self.scheduler.wave_number()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    pub fn projectiles(&self) -> &Pool<Projectile> {
        &self.projectiles
    }

    /// Advance by one fixed step of `dt_ms`
    pub fn step(&mut self, dt_ms: f64, input: &TickInput) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if input.pause && !self.pause_held {
            self.toggle_pause(&mut events);
        }
        self.pause_held = input.pause;

        match self.phase {
            SessionPhase::Playing | SessionPhase::Breather => {}
            _ => return events,
        }
        self.time_ms += dt_ms;
        let dt = (dt_ms / 1000.0) as f32;

        // Input
        self.player.steer(input.movement, dt, &self.field);
        if self.player.cool_down(dt_ms, input.fire) {
            let shot = Shot {
                origin: self.player.pos - Vec2::new(0.0, self.player.radius),
                angle: -FRAC_PI_2,
                speed: PLAYER_SHOT_SPEED,
            };
            if self.fire(Faction::Player, EntityId::PLAYER, &shot, &mut events) {
                events.push(GameEvent::Sound(sounds::SHOOT));
            }
        }

        // Waves
        self.update_waves(dt_ms, &mut events);

        // Entities
        let shots = self.scheduler.advance_enemies(
            dt_ms,
            self.player.pos,
            (self.time_ms / 1000.0) as f32,
        );
        let mut enemy_fired = false;
        for (source, shot) in &shots {
            enemy_fired |= self.fire(Faction::Enemy, *source, shot, &mut events);
        }
        if enemy_fired {
            events.push(GameEvent::Sound(sounds::ENEMY_SHOOT));
        }
        for handle in self.projectiles.active_handles() {
            if let Some(p) = self.projectiles.get_mut(handle) {
                p.advance(dt);
            }
        }

        // Collision
        self.resolve_collisions(&mut events);

        // Score and cleanup
        self.cleanup(&mut events);

        events
    }

    fn toggle_pause(&mut self, events: &mut Vec<GameEvent>) {
        let next = match self.phase {
            SessionPhase::Playing | SessionPhase::Breather => {
                self.resume_phase = self.phase;
                SessionPhase::Paused
            }
            SessionPhase::Paused => self.resume_phase,
            _ => return,
        };
        self.set_phase(next, events);
    }

    fn set_phase(&mut self, phase: SessionPhase, events: &mut Vec<GameEvent>) {
        if self.phase != phase {
            log::debug!("Session phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            events.push(GameEvent::PhaseChanged { phase });
        }
    }

    fn update_waves(&mut self, dt_ms: f64, events: &mut Vec<GameEvent>) {
        if self.phase == SessionPhase::Breather {
            self.breather_ms -= dt_ms;
            if self.breather_ms <= 0.0 {
                if self.scheduler.has_next_wave() {
                    if self.scheduler.start_wave().is_ok() {
                        self.set_phase(SessionPhase::Playing, events);
                    }
                } else {
                    log::info!("All {} waves cleared", self.scheduler.wave_number());
                    events.push(GameEvent::Sound(sounds::VICTORY));
                    self.set_phase(SessionPhase::Victory, events);
                    return;
                }
            }
        }

        for event in self.scheduler.update(dt_ms) {
            match &event {
                WaveEvent::Completed { wave } => {
                    events.push(GameEvent::Points {
                        amount: WAVE_CLEAR_BONUS * u64::from(*wave),
                        event: ScoreEvent::WaveCleared,
                    });
                    events.push(GameEvent::Sound(sounds::WAVE_CLEAR));
                    self.breather_ms = BREATHER_MS;
                    self.set_phase(SessionPhase::Breather, events);
                }
                WaveEvent::Failed { wave, error } => {
                    log::warn!("Halting session at wave {}: {}", wave, error);
                    self.set_phase(SessionPhase::Halted, events);
                }
                WaveEvent::Started { .. } | WaveEvent::Spawned { .. } => {}
            }
            events.push(GameEvent::Wave(event));
        }
    }

    /// Spawn one projectile. Returns false (and reports it) if the pool had
    /// no free instance.
    fn fire(
        &mut self,
        faction: Faction,
        source: EntityId,
        shot: &Shot,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let now = self.time_ms;
        let result = self.projectiles.acquire_with(|p| {
            *p = Projectile {
                pos: shot.origin,
                prev_pos: shot.origin,
                vel: shot.velocity(),
                radius: PROJECTILE_RADIUS,
                damage: 1,
                faction,
                source,
                created_ms: now,
                lifespan_ms: PROJECTILE_LIFESPAN_MS,
                lifecycle: Lifecycle::Active,
            };
        });
        match result {
            Ok(_) => true,
            Err(error) => {
                log::warn!("Projectile spawn skipped: {}", error);
                events.push(GameEvent::SpawnSkipped { error });
                false
            }
        }
    }

    fn resolve_collisions(&mut self, events: &mut Vec<GameEvent>) {
        self.bodies.clear();
        self.bodies.push(Body {
            key: EntityRef::Player,
            collider: self.player.collider(),
            active: self.player.is_alive(),
        });
        self.bodies
            .extend(self.scheduler.enemies().iter().map(|e| Body {
                key: EntityRef::Enemy(e.id),
                collider: e.collider(),
                active: e.is_active(),
            }));
        self.bodies
            .extend(self.projectiles.iter_active().map(|(handle, p)| Body {
                key: EntityRef::Projectile(handle),
                collider: p.collider(),
                active: p.is_active(),
            }));

        for hit in self.resolver.update(&self.bodies) {
            let (a, b) = if rank(hit.a) <= rank(hit.b) {
                (hit.a, hit.b)
            } else {
                (hit.b, hit.a)
            };
            match (a, b) {
                (EntityRef::Player, EntityRef::Enemy(id)) => {
                    let rammed = self
                        .scheduler
                        .enemy_mut(id)
                        .filter(|e| e.is_active())
                        .map(|e| {
                            let health = e.health;
                            e.take_damage(health);
                            e.pos
                        });
                    if let Some(pos) = rammed {
                        events.push(GameEvent::EnemyDestroyed { id, pos });
                        events.push(GameEvent::Sound(sounds::EXPLOSION));
                        self.hit_player(1, events);
                    }
                }
                (EntityRef::Player, EntityRef::Projectile(handle)) => {
                    if let Some(damage) = self.consume(handle, Faction::Enemy) {
                        self.hit_player(damage, events);
                    }
                }
                (EntityRef::Enemy(id), EntityRef::Projectile(handle)) => {
                    let alive = self
                        .scheduler
                        .enemies()
                        .iter()
                        .any(|e| e.id == id && e.is_active());
                    if !alive {
                        continue;
                    }
                    let Some(damage) = self.consume(handle, Faction::Player) else {
                        continue;
                    };
                    if let Some(enemy) = self.scheduler.enemy_mut(id) {
                        if enemy.take_damage(damage) {
                            let (pos, amount) = (enemy.pos, enemy.score_value);
                            events.push(GameEvent::EnemyDestroyed { id, pos });
                            events.push(GameEvent::Points {
                                amount,
                                event: ScoreEvent::EnemyKilled,
                            });
                            events.push(GameEvent::Sound(sounds::EXPLOSION));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Mark a live projectile of `faction` as spent, returning its damage
    fn consume(&mut self, handle: Handle, faction: Faction) -> Option<u32> {
        let p = self.projectiles.get_mut(handle)?;
        if !p.is_active() || p.faction != faction {
            return None;
        }
        p.lifecycle = Lifecycle::Destroyed;
        Some(p.damage)
    }

    fn hit_player(&mut self, damage: u32, events: &mut Vec<GameEvent>) {
        if self.player.take_hit(damage) {
            events.push(GameEvent::PlayerHit {
                health: self.player.health,
            });
            events.push(GameEvent::Sound(sounds::PLAYER_HIT));
        }
    }

    fn cleanup(&mut self, events: &mut Vec<GameEvent>) {
        let escape = self.field.expanded(ENEMY_ESCAPE_MARGIN);
        let gone: Vec<EntityId> = self
            .scheduler
            .enemies()
            .iter()
            .filter(|e| !e.is_active() || !escape.contains_point(e.pos))
            .map(|e| e.id)
            .collect();
        for id in gone {
            self.scheduler.on_entity_destroyed(id);
        }

        let now = self.time_ms;
        let field = self.field;
        self.projectiles
            .retain(|p| p.is_active() && !p.expired(now) && !p.out_of_bounds(&field));

        if !self.player.is_alive() && self.phase != SessionPhase::GameOver {
            log::info!(
                "Game over on wave {} after {:.1}s",
                self.scheduler.wave_number(),
                self.time_ms / 1000.0
            );
            events.push(GameEvent::Sound(sounds::GAME_OVER));
            self.set_phase(SessionPhase::GameOver, events);
        }

        if self.scheduler.phase() == WavePhase::Errored && !self.phase.is_finished() {
            self.set_phase(SessionPhase::Halted, events);
        }
    }
}

/// Order used to normalize collision pairs
fn rank(key: EntityRef) -> u8 {
    match key {
        EntityRef::Player => 0,
        EntityRef::Enemy(_) => 1,
        EntityRef::Projectile(_) => 2,
    }
}
