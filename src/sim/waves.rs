//! Wave configuration and difficulty progression
//!
//! Wave configs are immutable templates indexed by wave number (starting at
//! 1). They can be loaded from JSON or generated with `WaveTable::campaign`.

use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use super::geometry::Shape;
use super::patterns::{BlendedMovement, Movement, MovementPattern, ShotPattern, WeightedPattern};
use crate::error::SimError;

/// One kind of enemy a wave may spawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub name: String,
    pub health: u32,
    pub score_value: u64,
    pub shape: Shape,
    pub movement: Movement,
    #[serde(default)]
    pub shooting: Option<ShotPattern>,
    /// Milliseconds between volleys (ignored without a shooting pattern)
    #[serde(default)]
    pub fire_interval_ms: f64,
}

impl EnemyTemplate {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.health == 0 {
            return Err(SimError::InvalidConfig(format!(
                "enemy `{}` has zero health",
                self.name
            )));
        }
        self.movement.validate()?;
        if let Some(shooting) = &self.shooting {
            shooting.validate()?;
            if !(self.fire_interval_ms.is_finite() && self.fire_interval_ms > 0.0) {
                return Err(SimError::InvalidParameter {
                    name: "fire_interval_ms",
                    value: self.fire_interval_ms,
                });
            }
        }
        Ok(())
    }
}

/// Spawn location relative to the playfield (0..1 on each axis, may be
/// slightly outside to enter from off-screen) plus an extra delay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub delay_ms: f64,
}

/// Immutable template for one wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    pub id: u32,
    pub enemy_count: u32,
    pub spawn_interval_ms: f64,
    pub enemies: Vec<EnemyTemplate>,
    #[serde(default)]
    pub spawn_points: Vec<SpawnPoint>,
}

impl WaveConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.id == 0 {
            return Err(SimError::InvalidConfig("wave ids start at 1".into()));
        }
        if self.enemy_count == 0 {
            return Err(SimError::InvalidConfig(format!(
                "wave {} spawns no enemies",
                self.id
            )));
        }
        if !(self.spawn_interval_ms.is_finite() && self.spawn_interval_ms > 0.0) {
            return Err(SimError::InvalidParameter {
                name: "spawn_interval_ms",
                value: self.spawn_interval_ms,
            });
        }
        if self.enemies.is_empty() {
            return Err(SimError::InvalidConfig(format!(
                "wave {} has no enemy templates",
                self.id
            )));
        }
        for template in &self.enemies {
            template.validate()?;
        }
        for point in &self.spawn_points {
            if !(point.delay_ms.is_finite() && point.delay_ms >= 0.0) {
                return Err(SimError::InvalidParameter {
                    name: "delay_ms",
                    value: point.delay_ms,
                });
            }
        }
        Ok(())
    }
}

/// Per-wave scaling applied on top of a base wave
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    /// Extra enemies per wave
    pub count_step: u32,
    /// Spawn interval multiplier per wave
    pub interval_factor: f64,
    pub min_interval_ms: f64,
    /// +1 enemy health every this many waves
    pub health_every: u32,
    /// Speed multiplier per wave
    pub speed_factor: f32,
    pub max_speed_scale: f32,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            count_step: 2,
            interval_factor: 0.92,
            min_interval_ms: 250.0,
            health_every: 3,
            speed_factor: 1.05,
            max_speed_scale: 2.0,
        }
    }
}

impl Difficulty {
    /// Scale `base` for `wave` (wave 1 returns the base values)
    pub fn apply(&self, base: &WaveConfig, wave: u32) -> WaveConfig {
        let k = wave.saturating_sub(1);
        let speed_scale = self
            .speed_factor
            .powi(k as i32)
            .min(self.max_speed_scale);
        let extra_health = if self.health_every > 0 {
            k / self.health_every
        } else {
            0
        };

        WaveConfig {
            id: wave,
            enemy_count: base.enemy_count + self.count_step * k,
            spawn_interval_ms: (base.spawn_interval_ms * self.interval_factor.powi(k as i32))
                .max(self.min_interval_ms),
            enemies: base
                .enemies
                .iter()
                .map(|t| EnemyTemplate {
                    health: t.health + extra_health,
                    movement: t.movement.scaled(speed_scale),
                    ..t.clone()
                })
                .collect(),
            spawn_points: base.spawn_points.clone(),
        }
    }
}

#[derive(Deserialize)]
struct WaveFile {
    waves: Vec<WaveConfig>,
}

/// Wave configurations indexed by wave number
#[derive(Debug, Clone, Default)]
pub struct WaveTable {
    waves: BTreeMap<u32, WaveConfig>,
}

impl WaveTable {
    pub fn new(waves: Vec<WaveConfig>) -> Result<Self, SimError> {
        let mut table = BTreeMap::new();
        for wave in waves {
            wave.validate()?;
            let id = wave.id;
            if table.insert(id, wave).is_some() {
                return Err(SimError::InvalidConfig(format!("duplicate wave id {id}")));
            }
        }
        Ok(Self { waves: table })
    }

    /// Parse `{"waves": [...]}`
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let file: WaveFile =
            serde_json::from_str(json).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        Self::new(file.waves)
    }

    pub fn get(&self, wave: u32) -> Result<&WaveConfig, SimError> {
        self.waves
            .get(&wave)
            .ok_or(SimError::ConfigMissing { wave })
    }

    pub fn contains(&self, wave: u32) -> bool {
        self.waves.contains_key(&wave)
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Configurations in wave order
    pub fn iter(&self) -> impl Iterator<Item = &WaveConfig> + '_ {
        self.waves.values()
    }

    /// Built-in campaign of `waves` waves with the default difficulty curve
    pub fn campaign(waves: u32) -> Self {
        Self::campaign_with(waves, &Difficulty::default())
    }

    pub fn campaign_with(waves: u32, difficulty: &Difficulty) -> Self {
        let roster = campaign_roster();
        let table = (1..=waves)
            .map(|wave| {
                let unlocked = roster
                    .iter()
                    .filter(|(from, _)| *from <= wave)
                    .map(|(_, t)| t.clone())
                    .collect();
                let base = WaveConfig {
                    id: 1,
                    enemy_count: 6,
                    spawn_interval_ms: 1200.0,
                    enemies: unlocked,
                    spawn_points: top_edge_spawns(),
                };
                (wave, difficulty.apply(&base, wave))
            })
            .collect();
        Self { waves: table }
    }
}

fn top_edge_spawns() -> Vec<SpawnPoint> {
    [0.1, 0.3, 0.5, 0.7, 0.9]
        .into_iter()
        .map(|x| SpawnPoint {
            x,
            y: -0.03,
            delay_ms: 0.0,
        })
        .collect()
}

/// (first wave, template) pairs for the built-in campaign
fn campaign_roster() -> Vec<(u32, EnemyTemplate)> {
    let down = FRAC_PI_2;
    vec![
        (
            1,
            EnemyTemplate {
                name: "drone".into(),
                health: 1,
                score_value: 10,
                shape: Shape::Circle { radius: 12.0 },
                movement: MovementPattern::Linear {
                    speed: 90.0,
                    direction: down,
                }
                .into(),
                shooting: None,
                fire_interval_ms: 0.0,
            },
        ),
        (
            2,
            EnemyTemplate {
                name: "weaver".into(),
                health: 2,
                score_value: 25,
                shape: Shape::Circle { radius: 14.0 },
                movement: MovementPattern::SineWave {
                    speed: 70.0,
                    direction: down,
                    amplitude: 60.0,
                    frequency: 0.5,
                }
                .into(),
                shooting: Some(ShotPattern::Direct { speed: 180.0 }),
                fire_interval_ms: 1800.0,
            },
        ),
        (
            3,
            EnemyTemplate {
                name: "orbiter".into(),
                health: 3,
                score_value: 40,
                shape: Shape::Rect {
                    width: 28.0,
                    height: 20.0,
                },
                movement: Movement::Blend(BlendedMovement::from_parts_unchecked(vec![
                    WeightedPattern {
                        pattern: MovementPattern::Linear {
                            speed: 60.0,
                            direction: down,
                        },
                        weight: 0.6,
                    },
                    WeightedPattern {
                        pattern: MovementPattern::Circular {
                            speed: 120.0,
                            radius: 40.0,
                            phase: 0.0,
                        },
                        weight: 0.4,
                    },
                ])),
                shooting: Some(ShotPattern::Spread {
                    count: 3,
                    speed: 160.0,
                    angle_step: super::patterns::DEFAULT_SPREAD_STEP,
                }),
                fire_interval_ms: 2200.0,
            },
        ),
        (
            4,
            EnemyTemplate {
                name: "lancer".into(),
                health: 2,
                score_value: 35,
                shape: Shape::Rect {
                    width: 16.0,
                    height: 28.0,
                },
                movement: MovementPattern::Linear {
                    speed: 110.0,
                    direction: down,
                }
                .into(),
                shooting: Some(ShotPattern::Burst {
                    count: 3,
                    speed: 200.0,
                    speed_step: 20.0,
                }),
                fire_interval_ms: 2000.0,
            },
        ),
        (
            5,
            EnemyTemplate {
                name: "spinner".into(),
                health: 4,
                score_value: 60,
                shape: Shape::Circle { radius: 16.0 },
                movement: MovementPattern::ZigZag {
                    speed: 50.0,
                    direction: down,
                    amplitude: 80.0,
                    frequency: 0.4,
                }
                .into(),
                shooting: Some(ShotPattern::Spiral {
                    count: 8,
                    speed: 120.0,
                    rotation_speed: 1.2,
                }),
                fire_interval_ms: 2600.0,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAVES_JSON: &str = r#"{
        "waves": [
            {
                "id": 1,
                "enemy_count": 5,
                "spawn_interval_ms": 800,
                "enemies": [
                    {
                        "name": "drone",
                        "health": 1,
                        "score_value": 10,
                        "shape": {"kind": "circle", "radius": 12},
                        "movement": {"kind": "linear", "speed": 80, "direction": 1.5708}
                    }
                ],
                "spawn_points": [{"x": 0.5, "y": 0.0, "delay_ms": 250}]
            },
            {
                "id": 2,
                "enemy_count": 8,
                "spawn_interval_ms": 600,
                "enemies": [
                    {
                        "name": "gunner",
                        "health": 2,
                        "score_value": 20,
                        "shape": {"kind": "rect", "width": 20, "height": 16},
                        "movement": {"kind": "zig_zag", "speed": 60, "direction": 1.5708, "amplitude": 40, "frequency": 0.5},
                        "shooting": {"kind": "spread", "count": 3, "speed": 150},
                        "fire_interval_ms": 1500
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let table = WaveTable::from_json(WAVES_JSON).unwrap();
        assert_eq!(table.len(), 2);
        let w1 = table.get(1).unwrap();
        assert_eq!(w1.enemy_count, 5);
        assert_eq!(w1.spawn_points[0].delay_ms, 250.0);
        let w2 = table.get(2).unwrap();
        assert!(matches!(
            w2.enemies[0].shooting,
            Some(ShotPattern::Spread { count: 3, .. })
        ));
    }

    #[test]
    fn test_missing_wave() {
        let table = WaveTable::from_json(WAVES_JSON).unwrap();
        assert_eq!(table.get(3), Err(SimError::ConfigMissing { wave: 3 }));
    }

    #[test]
    fn test_validation_rejects_negative_pattern_parameters() {
        let bad = WAVES_JSON.replace(r#""speed": 80"#, r#""speed": -80"#);
        assert!(matches!(
            WaveTable::from_json(&bad),
            Err(SimError::InvalidParameter { name: "speed", .. })
        ));
    }

    #[test]
    fn test_validation_rejects_shooter_without_interval() {
        let bad = WAVES_JSON.replace(r#""fire_interval_ms": 1500"#, r#""fire_interval_ms": 0"#);
        assert!(WaveTable::from_json(&bad).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let table = WaveTable::from_json(WAVES_JSON).unwrap();
        let w = table.get(1).unwrap().clone();
        assert!(matches!(
            WaveTable::new(vec![w.clone(), w]),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            WaveTable::from_json("{\"waves\": 3}"),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_campaign_is_valid_and_escalates() {
        let table = WaveTable::campaign(10);
        assert_eq!(table.len(), 10);
        for wave in 1..=10 {
            table.get(wave).unwrap().validate().unwrap();
        }

        let first = table.get(1).unwrap();
        let tenth = table.get(10).unwrap();
        assert_eq!(first.enemies.len(), 1);
        assert_eq!(tenth.enemies.len(), 5);
        assert!(tenth.enemy_count > first.enemy_count);
        assert!(tenth.spawn_interval_ms < first.spawn_interval_ms);
        assert!(tenth.enemies[0].health > first.enemies[0].health);
        assert!(!table.contains(11));
    }

    #[test]
    fn test_difficulty_curve() {
        let table = WaveTable::from_json(WAVES_JSON).unwrap();
        let base = table.get(1).unwrap();
        let d = Difficulty::default();

        let w1 = d.apply(base, 1);
        assert_eq!(w1.enemy_count, base.enemy_count);
        assert_eq!(w1.spawn_interval_ms, base.spawn_interval_ms);

        let w4 = d.apply(base, 4);
        assert_eq!(w4.id, 4);
        assert_eq!(w4.enemy_count, 11);
        assert_eq!(w4.enemies[0].health, 2);
        assert!((w4.spawn_interval_ms - 800.0 * 0.92f64.powi(3)).abs() < 1e-9);

        // Interval bottoms out, speed caps at 2x
        let w60 = d.apply(base, 60);
        assert_eq!(w60.spawn_interval_ms, 250.0);
        match w60.enemies[0].movement {
            Movement::Single(MovementPattern::Linear { speed, .. }) => {
                assert!((speed - 160.0).abs() < 1e-3)
            }
            _ => panic!("expected linear movement"),
        }
    }
}
