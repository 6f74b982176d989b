//! Deterministic simulation core
//!
//! Everything here is pure and platform-free:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (spawn order, pool acquisition order)
//! - No rendering, audio or storage dependencies

pub mod collision;
pub mod entity;
pub mod geometry;
pub mod patterns;
pub mod pool;
pub mod quadtree;
pub mod scheduler;
pub mod timing;
pub mod waves;
pub mod world;

pub use collision::{Body, CollisionResolver, CollisionResult, Contact, collide};
pub use entity::{Enemy, EntityId, EntityRef, Faction, Lifecycle, Player, Projectile};
pub use geometry::{Collider, Rect, Shape};
pub use patterns::{BlendedMovement, Movement, MovementPattern, Shot, ShotPattern, WeightedPattern};
pub use pool::{Handle, Pool, PoolPolicy};
pub use quadtree::{QuadItem, QuadTree};
pub use scheduler::{WaveEvent, WavePhase, WaveScheduler};
pub use timing::{FixedTimestep, FramePlan};
pub use waves::{Difficulty, EnemyTemplate, SpawnPoint, WaveConfig, WaveTable};
pub use world::{GameEvent, ScoreEvent, SessionPhase, TickInput, World, WorldConfig};
