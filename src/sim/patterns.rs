//! Movement and shooting patterns
//!
//! Patterns are plain data dispatched through `match`; they hold no per-entity
//! state. The entity owns its elapsed time and passes it in each tick.
//!
//! Movement is expressed as a path offset `offset(t)` from wherever the entity
//! started. A step from `t` to `t + dt` moves the entity by
//! `offset(t + dt) - offset(t)`, which keeps patterns composable: a weighted
//! blend is just the weighted sum of the individual steps.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::{angle_to, heading};

/// Tolerance on blend weights summing to 1
pub const WEIGHT_TOLERANCE: f32 = 0.001;

/// Angle between neighbouring shots of a spread (30°)
pub const DEFAULT_SPREAD_STEP: f32 = std::f32::consts::PI / 6.0;

/// Burst shots each travel this fraction of the base speed faster than the last
pub const DEFAULT_BURST_SPEED_STEP: f32 = 0.1;

/// Movement pattern kinds. Angles are radians in screen space, so a
/// `direction` of π/2 heads down the playfield. Frequencies are in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MovementPattern {
    /// Constant heading
    Linear { speed: f32, direction: f32 },
    /// Advance along `direction` while oscillating sideways
    SineWave {
        speed: f32,
        direction: f32,
        amplitude: f32,
        frequency: f32,
    },
    /// Orbit at `speed` along a circle of `radius`. The orbit center sits
    /// `radius` away from the starting point, opposite `phase`.
    Circular { speed: f32, radius: f32, phase: f32 },
    /// Like `SineWave` but with a constant lateral speed that flips sign
    ZigZag {
        speed: f32,
        direction: f32,
        amplitude: f32,
        frequency: f32,
    },
}

impl MovementPattern {
    pub fn linear(speed: f32, direction: f32) -> Result<Self, SimError> {
        Self::Linear { speed, direction }.validated()
    }

    pub fn sine_wave(
        speed: f32,
        direction: f32,
        amplitude: f32,
        frequency: f32,
    ) -> Result<Self, SimError> {
        Self::SineWave {
            speed,
            direction,
            amplitude,
            frequency,
        }
        .validated()
    }

    pub fn circular(speed: f32, radius: f32, phase: f32) -> Result<Self, SimError> {
        Self::Circular {
            speed,
            radius,
            phase,
        }
        .validated()
    }

    pub fn zigzag(
        speed: f32,
        direction: f32,
        amplitude: f32,
        frequency: f32,
    ) -> Result<Self, SimError> {
        Self::ZigZag {
            speed,
            direction,
            amplitude,
            frequency,
        }
        .validated()
    }

    fn validated(self) -> Result<Self, SimError> {
        self.validate()?;
        Ok(self)
    }

    /// Check parameter preconditions. Deserialized patterns bypass the
    /// constructors, so wave configs call this on load.
    pub fn validate(&self) -> Result<(), SimError> {
        match *self {
            MovementPattern::Linear { speed, direction } => {
                non_negative("speed", speed)?;
                finite("direction", direction)
            }
            MovementPattern::SineWave {
                speed,
                direction,
                amplitude,
                frequency,
            }
            | MovementPattern::ZigZag {
                speed,
                direction,
                amplitude,
                frequency,
            } => {
                non_negative("speed", speed)?;
                finite("direction", direction)?;
                non_negative("amplitude", amplitude)?;
                non_negative("frequency", frequency)
            }
            MovementPattern::Circular {
                speed,
                radius,
                phase,
            } => {
                non_negative("speed", speed)?;
                finite("phase", phase)?;
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(SimError::InvalidParameter {
                        name: "radius",
                        value: f64::from(radius),
                    });
                }
                Ok(())
            }
        }
    }

    /// Same pattern with its travel speed multiplied by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        let mut out = *self;
        match &mut out {
            MovementPattern::Linear { speed, .. }
            | MovementPattern::SineWave { speed, .. }
            | MovementPattern::Circular { speed, .. }
            | MovementPattern::ZigZag { speed, .. } => *speed *= factor,
        }
        out
    }

    /// Displacement from the starting point after `t` seconds
    pub fn offset(&self, t: f32) -> Vec2 {
        match *self {
            MovementPattern::Linear { speed, direction } => heading(direction) * speed * t,
            MovementPattern::SineWave {
                speed,
                direction,
                amplitude,
                frequency,
            } => {
                let lateral = amplitude * (TAU * frequency * t).sin();
                heading(direction) * speed * t + heading(direction + FRAC_PI_2) * lateral
            }
            MovementPattern::Circular {
                speed,
                radius,
                phase,
            } => {
                let angle = phase + speed / radius * t;
                radius * (heading(angle) - heading(phase))
            }
            MovementPattern::ZigZag {
                speed,
                direction,
                amplitude,
                frequency,
            } => {
                let lateral = amplitude * triangle(frequency * t);
                heading(direction) * speed * t + heading(direction + FRAC_PI_2) * lateral
            }
        }
    }

    /// Position after advancing from `elapsed` to `elapsed + dt` seconds
    pub fn next_position(&self, current: Vec2, elapsed: f32, dt: f32) -> Vec2 {
        current + self.offset(elapsed + dt) - self.offset(elapsed)
    }
}

/// Triangle wave over cycles: 0 at u=0, +1 at u=0.25, -1 at u=0.75
fn triangle(u: f32) -> f32 {
    let phase = u - u.floor();
    if phase < 0.25 {
        phase * 4.0
    } else if phase < 0.75 {
        2.0 - phase * 4.0
    } else {
        phase * 4.0 - 4.0
    }
}

/// One component of a blend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedPattern {
    pub pattern: MovementPattern,
    pub weight: f32,
}

/// Weighted sum of movement patterns; weights must sum to 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendedMovement {
    blend: Vec<WeightedPattern>,
}

impl BlendedMovement {
    pub fn new(blend: Vec<WeightedPattern>) -> Result<Self, SimError> {
        let out = Self { blend };
        out.validate()?;
        Ok(out)
    }

    /// Build without validation, for tables defined in code whose weights
    /// are known to be valid
    pub(crate) fn from_parts_unchecked(blend: Vec<WeightedPattern>) -> Self {
        Self { blend }
    }

    pub fn parts(&self) -> &[WeightedPattern] {
        &self.blend
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.blend.is_empty() {
            return Err(SimError::InvalidWeights { sum: 0.0 });
        }
        for part in &self.blend {
            part.pattern.validate()?;
            non_negative("weight", part.weight)?;
        }
        let sum: f32 = self.blend.iter().map(|p| p.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(SimError::InvalidWeights { sum });
        }
        Ok(())
    }

    pub fn offset(&self, t: f32) -> Vec2 {
        self.blend
            .iter()
            .map(|p| p.pattern.offset(t) * p.weight)
            .sum()
    }
}

/// Movement assigned to an enemy: one pattern or a blend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Movement {
    Single(MovementPattern),
    Blend(BlendedMovement),
}

impl Movement {
    pub fn validate(&self) -> Result<(), SimError> {
        match self {
            Movement::Single(p) => p.validate(),
            Movement::Blend(b) => b.validate(),
        }
    }

    pub fn scaled(&self, factor: f32) -> Self {
        match self {
            Movement::Single(p) => Movement::Single(p.scaled(factor)),
            Movement::Blend(b) => Movement::Blend(BlendedMovement {
                blend: b
                    .blend
                    .iter()
                    .map(|w| WeightedPattern {
                        pattern: w.pattern.scaled(factor),
                        weight: w.weight,
                    })
                    .collect(),
            }),
        }
    }

    pub fn offset(&self, t: f32) -> Vec2 {
        match self {
            Movement::Single(p) => p.offset(t),
            Movement::Blend(b) => b.offset(t),
        }
    }

    pub fn next_position(&self, current: Vec2, elapsed: f32, dt: f32) -> Vec2 {
        current + self.offset(elapsed + dt) - self.offset(elapsed)
    }
}

impl From<MovementPattern> for Movement {
    fn from(p: MovementPattern) -> Self {
        Movement::Single(p)
    }
}

/// A single projectile to launch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub origin: Vec2,
    /// Travel angle in radians
    pub angle: f32,
    pub speed: f32,
}

impl Shot {
    pub fn velocity(&self) -> Vec2 {
        heading(self.angle) * self.speed
    }
}

/// Shooting pattern kinds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShotPattern {
    /// One shot straight at the target
    Direct { speed: f32 },
    /// `count` shots fanned `angle_step` apart, centered on the target
    Spread {
        count: u32,
        speed: f32,
        #[serde(default = "default_spread_step")]
        angle_step: f32,
    },
    /// `count` shots at the target, each `speed_step` faster than the last
    Burst {
        count: u32,
        speed: f32,
        speed_step: f32,
    },
    /// `count` shots evenly around a full circle, rotating with global time
    Spiral {
        count: u32,
        speed: f32,
        /// Radians per second
        rotation_speed: f32,
    },
}

fn default_spread_step() -> f32 {
    DEFAULT_SPREAD_STEP
}

impl ShotPattern {
    pub fn direct(speed: f32) -> Result<Self, SimError> {
        Self::Direct { speed }.validated()
    }

    pub fn spread(count: u32, speed: f32) -> Result<Self, SimError> {
        Self::spread_with_step(count, speed, DEFAULT_SPREAD_STEP)
    }

    pub fn spread_with_step(count: u32, speed: f32, angle_step: f32) -> Result<Self, SimError> {
        Self::Spread {
            count,
            speed,
            angle_step,
        }
        .validated()
    }

    pub fn burst(count: u32, speed: f32) -> Result<Self, SimError> {
        Self::Burst {
            count,
            speed,
            speed_step: speed * DEFAULT_BURST_SPEED_STEP,
        }
        .validated()
    }

    pub fn spiral(count: u32, speed: f32, rotation_speed: f32) -> Result<Self, SimError> {
        Self::Spiral {
            count,
            speed,
            rotation_speed,
        }
        .validated()
    }

    fn validated(self) -> Result<Self, SimError> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        match *self {
            ShotPattern::Direct { speed } => non_negative("speed", speed),
            ShotPattern::Spread {
                count,
                speed,
                angle_step,
            } => {
                at_least_one(count)?;
                non_negative("speed", speed)?;
                non_negative("angle_step", angle_step)
            }
            ShotPattern::Burst {
                count,
                speed,
                speed_step,
            } => {
                at_least_one(count)?;
                non_negative("speed", speed)?;
                non_negative("speed_step", speed_step)
            }
            ShotPattern::Spiral {
                count,
                speed,
                rotation_speed,
            } => {
                at_least_one(count)?;
                non_negative("speed", speed)?;
                finite("rotation_speed", rotation_speed)
            }
        }
    }

    /// Shots fired from `source` toward `target` at global time `time` (seconds)
    pub fn fire(&self, source: Vec2, target: Vec2, time: f32) -> Vec<Shot> {
        let aim = angle_to(source, target);
        let shot = |angle: f32, speed: f32| Shot {
            origin: source,
            angle,
            speed,
        };

        match *self {
            ShotPattern::Direct { speed } => vec![shot(aim, speed)],
            ShotPattern::Spread {
                count,
                speed,
                angle_step,
            } => {
                let center = (count as f32 - 1.0) / 2.0;
                (0..count)
                    .map(|i| shot(aim + (i as f32 - center) * angle_step, speed))
                    .collect()
            }
            ShotPattern::Burst {
                count,
                speed,
                speed_step,
            } => (0..count)
                .map(|i| shot(aim, speed + i as f32 * speed_step))
                .collect(),
            ShotPattern::Spiral {
                count,
                speed,
                rotation_speed,
            } => {
                let base = rotation_speed * time;
                let step = TAU / count as f32;
                (0..count)
                    .map(|i| shot(base + i as f32 * step, speed))
                    .collect()
            }
        }
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), SimError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            name,
            value: f64::from(value),
        })
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), SimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidParameter {
            name,
            value: f64::from(value),
        })
    }
}

fn at_least_one(count: u32) -> Result<(), SimError> {
    if count == 0 {
        return Err(SimError::InvalidParameter {
            name: "count",
            value: 0.0,
        });
    }
    Ok(())
}
