//! Simulation entities
//!
//! Each entity is owned by exactly one subsystem: the player by the world,
//! enemies by the wave scheduler, projectiles by the projectile pool. Other
//! code only sees them through `Body` snapshots.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::{Collider, Rect, Shape};
use super::patterns::{Movement, ShotPattern};
use super::pool::Handle;
use crate::consts::*;

/// Stable identifier for the player and enemies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub const PLAYER: EntityId = EntityId(0);
}

/// Lifecycle of any entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Sitting in a pool, not simulated
    #[default]
    Inactive,
    Active,
    /// Dead this tick; removed during cleanup
    Destroyed,
}

/// Which side fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Faction {
    #[default]
    Player,
    Enemy,
}

/// Collision key naming the owner of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Player,
    Enemy(EntityId),
    Projectile(Handle),
}

/// The player's ship
#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub health: u32,
    /// Milliseconds until the next shot is allowed
    pub fire_cooldown_ms: f64,
    /// Milliseconds of remaining hit immunity
    pub invulnerable_ms: f64,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            prev_pos: pos,
            radius: PLAYER_RADIUS,
            speed: PLAYER_SPEED,
            health: PLAYER_HEALTH,
            fire_cooldown_ms: 0.0,
            invulnerable_ms: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn collider(&self) -> Collider {
        Shape::Circle {
            radius: self.radius,
        }
        .at(self.pos)
    }

    /// Move along `direction` (components in [-1, 1]) and stay inside `field`
    pub fn steer(&mut self, direction: Vec2, dt: f32, field: &Rect) {
        self.prev_pos = self.pos;
        let dir = if direction.length_squared() > 1.0 {
            direction.normalize()
        } else {
            direction
        };
        self.pos += dir * self.speed * dt;
        self.pos.x = self.pos.x.clamp(field.x + self.radius, field.right() - self.radius);
        self.pos.y = self.pos.y.clamp(field.y + self.radius, field.bottom() - self.radius);
    }

    /// Count down timers; returns true when a shot may be fired this tick
    pub fn cool_down(&mut self, dt_ms: f64, wants_fire: bool) -> bool {
        self.fire_cooldown_ms = (self.fire_cooldown_ms - dt_ms).max(0.0);
        self.invulnerable_ms = (self.invulnerable_ms - dt_ms).max(0.0);
        if wants_fire && self.fire_cooldown_ms <= 0.0 {
            self.fire_cooldown_ms = PLAYER_FIRE_INTERVAL_MS;
            return true;
        }
        false
    }

    /// Apply damage unless invulnerable. Returns true if the hit landed.
    pub fn take_hit(&mut self, damage: u32) -> bool {
        if self.invulnerable_ms > 0.0 || !self.is_alive() {
            return false;
        }
        self.health = self.health.saturating_sub(damage);
        self.invulnerable_ms = PLAYER_INVULNERABLE_MS;
        true
    }
}

/// An enemy spawned by the wave scheduler
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: EntityId,
    /// Template name from the wave configuration (doubles as sprite id)
    pub kind: String,
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub shape: Shape,
    pub health: u32,
    pub score_value: u64,
    pub movement: Movement,
    pub shooting: Option<ShotPattern>,
    pub fire_interval_ms: f64,
    pub fire_timer_ms: f64,
    /// Seconds since spawn, fed to the movement pattern
    pub age: f32,
    pub lifecycle: Lifecycle,
}

impl Enemy {
    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn collider(&self) -> Collider {
        self.shape.at(self.pos)
    }

    /// Advance along the movement pattern
    pub fn advance(&mut self, dt: f32) {
        self.prev_pos = self.pos;
        self.pos = self.movement.next_position(self.pos, self.age, dt);
        self.vel = if dt > 0.0 {
            (self.pos - self.prev_pos) / dt
        } else {
            Vec2::ZERO
        };
        self.age += dt;
    }

    /// Count the fire timer down; true when the enemy should shoot now
    pub fn ready_to_fire(&mut self, dt_ms: f64) -> bool {
        if self.shooting.is_none() || self.fire_interval_ms <= 0.0 {
            return false;
        }
        self.fire_timer_ms += dt_ms;
        if self.fire_timer_ms >= self.fire_interval_ms {
            self.fire_timer_ms -= self.fire_interval_ms;
            return true;
        }
        false
    }

    /// Apply damage. Returns true if this hit killed the enemy.
    pub fn take_damage(&mut self, damage: u32) -> bool {
        if !self.is_active() {
            return false;
        }
        self.health = self.health.saturating_sub(damage);
        if self.health == 0 {
            self.lifecycle = Lifecycle::Destroyed;
            return true;
        }
        false
    }
}

/// A pooled projectile. `Default` is the pool's reset state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projectile {
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub damage: u32,
    pub faction: Faction,
    /// Who fired it
    pub source: EntityId,
    /// Simulation time (ms) at which it was fired
    pub created_ms: f64,
    pub lifespan_ms: f64,
    pub lifecycle: Lifecycle,
}

impl Projectile {
    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn collider(&self) -> Collider {
        Shape::Circle {
            radius: self.radius,
        }
        .at(self.pos)
    }

    pub fn advance(&mut self, dt: f32) {
        self.prev_pos = self.pos;
        self.pos += self.vel * dt;
    }

    pub fn expired(&self, now_ms: f64) -> bool {
        now_ms - self.created_ms >= self.lifespan_ms
    }

    pub fn out_of_bounds(&self, field: &Rect) -> bool {
        !field.expanded(OUT_OF_BOUNDS_MARGIN).contains_point(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::patterns::MovementPattern;
    use std::f32::consts::FRAC_PI_2;

    fn field() -> Rect {
        Rect::new(0.0, 0.0, PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT)
    }

    fn enemy(health: u32) -> Enemy {
        Enemy {
            id: EntityId(7),
            kind: "grunt".into(),
            pos: Vec2::new(100.0, 0.0),
            prev_pos: Vec2::new(100.0, 0.0),
            vel: Vec2::ZERO,
            shape: Shape::Circle { radius: 10.0 },
            health,
            score_value: 50,
            movement: MovementPattern::linear(60.0, FRAC_PI_2).unwrap().into(),
            shooting: Some(ShotPattern::direct(100.0).unwrap()),
            fire_interval_ms: 500.0,
            fire_timer_ms: 0.0,
            age: 0.0,
            lifecycle: Lifecycle::Active,
        }
    }

    #[test]
    fn test_player_clamped_to_field() {
        let mut player = Player::new(Vec2::new(10.0, 10.0));
        player.steer(Vec2::new(-1.0, -1.0), 1.0, &field());
        assert_eq!(player.pos, Vec2::new(PLAYER_RADIUS, PLAYER_RADIUS));
        assert_eq!(player.prev_pos, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_player_diagonal_not_faster() {
        let mut player = Player::new(Vec2::new(200.0, 300.0));
        player.steer(Vec2::new(1.0, 1.0), 0.1, &field());
        let moved = (player.pos - player.prev_pos).length();
        assert!((moved - PLAYER_SPEED * 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_player_fire_cooldown() {
        let mut player = Player::new(Vec2::ZERO);
        assert!(player.cool_down(16.0, true));
        assert!(!player.cool_down(16.0, true));
        assert!(player.cool_down(PLAYER_FIRE_INTERVAL_MS, true));
    }

    #[test]
    fn test_player_invulnerability_window() {
        let mut player = Player::new(Vec2::ZERO);
        assert!(player.take_hit(1));
        assert!(!player.take_hit(1));
        assert_eq!(player.health, PLAYER_HEALTH - 1);
        player.cool_down(PLAYER_INVULNERABLE_MS, false);
        assert!(player.take_hit(1));
    }

    #[test]
    fn test_enemy_follows_pattern() {
        let mut e = enemy(1);
        e.advance(0.5);
        assert!((e.pos - Vec2::new(100.0, 30.0)).length() < 1e-3);
        assert!((e.vel - Vec2::new(0.0, 60.0)).length() < 1e-2);
        assert_eq!(e.age, 0.5);
    }

    #[test]
    fn test_enemy_damage_and_death() {
        let mut e = enemy(2);
        assert!(!e.take_damage(1));
        assert!(e.take_damage(1));
        assert_eq!(e.lifecycle, Lifecycle::Destroyed);
        // Already destroyed: further hits do nothing
        assert!(!e.take_damage(1));
    }

    #[test]
    fn test_enemy_fire_timer() {
        let mut e = enemy(1);
        assert!(!e.ready_to_fire(400.0));
        assert!(e.ready_to_fire(100.0));
        assert!(!e.ready_to_fire(100.0));
        e.shooting = None;
        assert!(!e.ready_to_fire(10_000.0));
    }

    #[test]
    fn test_projectile_expiry_and_bounds() {
        let p = Projectile {
            pos: Vec2::new(-OUT_OF_BOUNDS_MARGIN - 1.0, 10.0),
            created_ms: 100.0,
            lifespan_ms: 500.0,
            lifecycle: Lifecycle::Active,
            ..Default::default()
        };
        assert!(!p.expired(599.0));
        assert!(p.expired(600.0));
        assert!(p.out_of_bounds(&field()));
    }
}
