//! Star Strike - A vertical arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (loop timing, spatial index, collisions, pools, waves)
//! - `game`: Context object tying the simulation to its collaborators
//! - `platform`: Collaborator interfaces (render, audio, input, score)
//! - `persistence`: Key-value storage backends
//! - `highscores`: Leaderboard persisted through a storage backend

pub mod assets;
pub mod audio;
pub mod error;
pub mod game;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod score;
pub mod settings;
pub mod sim;

pub use error::{RenderError, SimError, StorageError};
pub use game::Game;
pub use highscores::HighScores;
pub use settings::Settings;

use glam::Vec2;

/// Sound ids emitted by the simulation
pub mod sounds {
    pub const SHOOT: &str = "shoot";
    pub const ENEMY_SHOOT: &str = "enemy_shoot";
    pub const EXPLOSION: &str = "explosion";
    pub const PLAYER_HIT: &str = "player_hit";
    pub const WAVE_CLEAR: &str = "wave_clear";
    pub const GAME_OVER: &str = "game_over";
    pub const VICTORY: &str = "victory";

    pub const ALL: [&str; 7] = [
        SHOOT,
        ENEMY_SHOOT,
        EXPLOSION,
        PLAYER_HIT,
        WAVE_CLEAR,
        GAME_OVER,
        VICTORY,
    ];
}

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (60 Hz)
    pub const FIXED_STEP_MS: f64 = 1000.0 / 60.0;
    /// Raw frame time is clamped to this before entering the accumulator
    pub const MAX_FRAME_TIME_MS: f64 = 100.0;
    /// Allowed range for the target step rate
    pub const MIN_FPS: u32 = 20;
    pub const MAX_FPS: u32 = 120;
    /// FPS counter window
    pub const FPS_WINDOW_MS: f64 = 1000.0;

    /// Playfield dimensions (origin top-left, y grows downward)
    pub const PLAYFIELD_WIDTH: f32 = 480.0;
    pub const PLAYFIELD_HEIGHT: f32 = 640.0;

    /// Quadtree limits
    pub const QUADTREE_MAX_OBJECTS: usize = 10;
    pub const QUADTREE_MAX_LEVELS: u32 = 5;

    /// Default pool capacity
    pub const DEFAULT_POOL_SIZE: usize = 100;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 14.0;
    pub const PLAYER_SPEED: f32 = 260.0;
    pub const PLAYER_HEALTH: u32 = 5;
    pub const PLAYER_FIRE_INTERVAL_MS: f64 = 180.0;
    pub const PLAYER_INVULNERABLE_MS: f64 = 1200.0;

    /// Projectile defaults
    pub const PLAYER_SHOT_SPEED: f32 = 520.0;
    pub const PROJECTILE_RADIUS: f32 = 4.0;
    pub const PROJECTILE_LIFESPAN_MS: f64 = 3000.0;
    /// Projectiles further than this outside the playfield are discarded
    pub const OUT_OF_BOUNDS_MARGIN: f32 = 32.0;
    /// Enemies further than this outside the playfield have escaped
    pub const ENEMY_ESCAPE_MARGIN: f32 = 64.0;
    /// Player start height above the bottom edge
    pub const PLAYER_START_OFFSET: f32 = 60.0;

    /// Waves in the built-in campaign
    pub const CAMPAIGN_WAVES: u32 = 10;
    /// Pause between a cleared wave and the next one
    pub const BREATHER_MS: f64 = 2000.0;
    /// Bonus per wave number on wave clear
    pub const WAVE_CLEAR_BONUS: u64 = 100;
}

/// Unit vector for a heading angle (radians, 0 = +x, π/2 = +y/down)
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of the vector pointing from `from` to `to`
#[inline]
pub fn angle_to(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Linear blend between the previous and current simulated position
#[inline]
pub fn interpolate(prev: Vec2, current: Vec2, alpha: f32) -> Vec2 {
    prev + (current - prev) * alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_heading_and_angle_to() {
        let down = heading(FRAC_PI_2);
        assert!(down.x.abs() < 1e-6);
        assert!((down.y - 1.0).abs() < 1e-6);

        let a = angle_to(Vec2::ZERO, Vec2::new(0.0, 10.0));
        assert!((a - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_interpolate() {
        let p = interpolate(Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0), 0.25);
        assert!((p - Vec2::new(2.5, 5.0)).length() < 1e-6);
    }
}
