//! Game settings
//!
//! Persisted as JSON under their own key. Missing fields take their default,
//! and a stored value that fails validation is replaced by the defaults.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{SimError, StorageError};
use crate::persistence::{KeyValueStore, load_json, save_json};
use crate::sim::{FixedTimestep, PoolPolicy, Rect, WorldConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Loop ===
    /// Fixed update rate (20..=120)
    pub target_fps: u32,
    /// Longest raw frame fed to the accumulator
    pub max_frame_time_ms: f64,

    // === Simulation ===
    pub pool_capacity: usize,
    pub pool_policy: PoolPolicy,
    pub playfield_width: f32,
    pub playfield_height: f32,
    /// Fixed RNG seed; a fresh seed per session when absent
    pub seed: Option<u64>,

    // === Audio ===
    pub master_volume: f32,
    pub sfx_volume: f32,
    pub muted: bool,

    // === HUD ===
    pub show_fps: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_frame_time_ms: MAX_FRAME_TIME_MS,

            pool_capacity: DEFAULT_POOL_SIZE,
            pool_policy: PoolPolicy::Bounded,
            playfield_width: PLAYFIELD_WIDTH,
            playfield_height: PLAYFIELD_HEIGHT,
            seed: None,

            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,

            show_fps: true,
        }
    }
}

impl Settings {
    pub const STORAGE_KEY: &'static str = "star_strike_settings";

    pub fn validate(&self) -> Result<(), SimError> {
        if !(MIN_FPS..=MAX_FPS).contains(&self.target_fps) {
            return Err(SimError::InvalidParameter {
                name: "target_fps",
                value: f64::from(self.target_fps),
            });
        }
        positive("max_frame_time_ms", self.max_frame_time_ms)?;
        if self.pool_capacity == 0 {
            return Err(SimError::InvalidParameter {
                name: "pool_capacity",
                value: 0.0,
            });
        }
        positive("playfield_width", f64::from(self.playfield_width))?;
        positive("playfield_height", f64::from(self.playfield_height))?;
        unit("master_volume", self.master_volume)?;
        unit("sfx_volume", self.sfx_volume)
    }

    /// Load from the store. Missing, unreadable or invalid settings fall back
    /// to the defaults.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match load_json::<Settings>(store, Self::STORAGE_KEY) {
            Ok(Some(settings)) => match settings.validate() {
                Ok(()) => {
                    log::info!("Loaded settings");
                    settings
                }
                Err(e) => {
                    log::warn!("Stored settings rejected ({}), using defaults", e);
                    Self::default()
                }
            },
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Could not read settings ({}), using defaults", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        save_json(store, Self::STORAGE_KEY, self)?;
        log::info!("Settings saved");
        Ok(())
    }

    pub fn playfield(&self) -> Rect {
        Rect::new(0.0, 0.0, self.playfield_width, self.playfield_height)
    }

    pub fn world_config(&self, seed: u64) -> WorldConfig {
        WorldConfig {
            field: self.playfield(),
            pool_capacity: self.pool_capacity,
            pool_policy: self.pool_policy,
            seed,
        }
    }

    pub fn timestep(&self) -> Result<FixedTimestep, SimError> {
        FixedTimestep::new(self.target_fps)?.with_max_frame_time(self.max_frame_time_ms)
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidParameter { name, value })
    }
}

fn unit(name: &'static str, value: f32) -> Result<(), SimError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            name,
            value: f64::from(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.pool_policy, PoolPolicy::Bounded);
        let clock = settings.timestep().unwrap();
        assert!((clock.step_ms() - FIXED_STEP_MS).abs() < 1e-9);
    }

    #[test]
    fn test_validation() {
        let bad_fps = Settings {
            target_fps: 240,
            ..Default::default()
        };
        assert!(matches!(
            bad_fps.validate(),
            Err(SimError::InvalidParameter { name: "target_fps", .. })
        ));

        let bad_volume = Settings {
            sfx_volume: 1.5,
            ..Default::default()
        };
        assert!(bad_volume.validate().is_err());

        let empty_pool = Settings {
            pool_capacity: 0,
            ..Default::default()
        };
        assert!(empty_pool.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"target_fps": 30, "pool_policy": "grow"}"#).unwrap();
        assert_eq!(settings.target_fps, 30);
        assert_eq!(settings.pool_policy, PoolPolicy::Grow);
        assert_eq!(settings.pool_capacity, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_load_save_and_fallbacks() {
        let mut store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());

        let custom = Settings {
            target_fps: 120,
            seed: Some(99),
            ..Default::default()
        };
        custom.save(&mut store).unwrap();
        assert_eq!(Settings::load(&store), custom);

        store
            .set(Settings::STORAGE_KEY, r#"{"target_fps": 5}"#)
            .unwrap();
        assert_eq!(Settings::load(&store), Settings::default());

        assert_eq!(
            Settings::load(&MemoryStore::unavailable()),
            Settings::default()
        );
    }

    #[test]
    fn test_world_config() {
        let settings = Settings {
            playfield_width: 320.0,
            pool_capacity: 8,
            ..Default::default()
        };
        let config = settings.world_config(5);
        assert_eq!(config.field.width, 320.0);
        assert_eq!(config.pool_capacity, 8);
        assert_eq!(config.seed, 5);
    }
}
