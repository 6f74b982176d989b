//! Fixed timestep loop controller
//!
//! Converts raw frame times into a whole number of fixed simulation steps plus
//! a render interpolation factor. Raw time is clamped before it enters the
//! accumulator so a long stall cannot snowball into an ever-growing backlog.

use crate::consts::{FPS_WINDOW_MS, MAX_FPS, MAX_FRAME_TIME_MS, MIN_FPS};
use crate::error::SimError;

/// What the caller should do for one rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePlan {
    /// Number of fixed updates to run (already deducted from the accumulator)
    pub fixed_steps: u32,
    /// Blend factor between the previous and current simulated state, in [0, 1)
    pub render_interpolation: f32,
}

/// Accumulator-based fixed timestep scheduler
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step_ms: f64,
    /// Step size requested by `set_target_fps`, applied on the next frame
    pending_step_ms: Option<f64>,
    max_frame_ms: f64,
    accumulator: f64,
    running: bool,
    total_steps: u64,
    // FPS window
    frame_count: u32,
    window_ms: f64,
    fps: f64,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self {
            step_ms: crate::consts::FIXED_STEP_MS,
            pending_step_ms: None,
            max_frame_ms: MAX_FRAME_TIME_MS,
            accumulator: 0.0,
            running: true,
            total_steps: 0,
            frame_count: 0,
            window_ms: 0.0,
            fps: 0.0,
        }
    }
}

impl FixedTimestep {
    /// Create a loop stepping `target_fps` times per simulated second
    pub fn new(target_fps: u32) -> Result<Self, SimError> {
        Ok(Self {
            step_ms: step_for_fps(target_fps)?,
            ..Self::default()
        })
    }

    /// Override the raw frame time clamp
    pub fn with_max_frame_time(mut self, max_frame_ms: f64) -> Result<Self, SimError> {
        if !max_frame_ms.is_finite() || max_frame_ms <= 0.0 {
            return Err(SimError::InvalidParameter {
                name: "max_frame_time_ms",
                value: max_frame_ms,
            });
        }
        self.max_frame_ms = max_frame_ms;
        Ok(self)
    }

    /// Change the step rate. Takes effect on the next `tick`/`run`, leaving
    /// time already in the accumulator untouched.
    pub fn set_target_fps(&mut self, fps: u32) -> Result<(), SimError> {
        self.pending_step_ms = Some(step_for_fps(fps)?);
        Ok(())
    }

    /// Fixed step size in milliseconds
    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    /// Time carried over to the next frame
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Most recent FPS measurement (0 until the first window closes)
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Total fixed steps executed since construction
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop scheduling further steps. Frames after this are no-ops.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Resume after `stop`, discarding any stale accumulated time
    pub fn start(&mut self) {
        self.running = true;
        self.accumulator = 0.0;
    }

    /// Advance by one raw frame and report how many fixed steps are due.
    ///
    /// The steps are deducted immediately; the caller must run exactly
    /// `fixed_steps` updates of `step_ms()` each.
    pub fn tick(&mut self, raw_elapsed_ms: f64) -> FramePlan {
        if !self.running {
            return self.plan(0);
        }
        self.begin_frame(raw_elapsed_ms);

        let mut steps = 0;
        while self.accumulator >= self.step_ms {
            self.accumulator -= self.step_ms;
            steps += 1;
        }
        self.total_steps += u64::from(steps);
        self.plan(steps)
    }

    /// Advance by one raw frame, invoking `update` once per fixed step.
    ///
    /// If `update` fails the loop stops, the failed step is not deducted
    /// from the accumulator, and the error is returned to the caller.
    pub fn run<E, F>(&mut self, raw_elapsed_ms: f64, mut update: F) -> Result<FramePlan, E>
    where
        F: FnMut(f64) -> Result<(), E>,
    {
        if !self.running {
            return Ok(self.plan(0));
        }
        self.begin_frame(raw_elapsed_ms);

        let mut steps = 0;
        while self.accumulator >= self.step_ms {
            if let Err(err) = update(self.step_ms) {
                self.running = false;
                self.total_steps += u64::from(steps);
                log::error!("Fixed update failed after {} steps; loop stopped", steps);
                return Err(err);
            }
            self.accumulator -= self.step_ms;
            steps += 1;
        }
        self.total_steps += u64::from(steps);
        Ok(self.plan(steps))
    }

    /// Apply pending rate changes, clamp the raw time, and feed the accumulator
    fn begin_frame(&mut self, raw_elapsed_ms: f64) {
        if let Some(step) = self.pending_step_ms.take() {
            log::debug!("Step size changed {:.3}ms -> {:.3}ms", self.step_ms, step);
            self.step_ms = step;
        }

        let raw = if raw_elapsed_ms.is_finite() {
            raw_elapsed_ms.max(0.0)
        } else {
            0.0
        };
        self.accumulator += raw.min(self.max_frame_ms);

        self.frame_count += 1;
        self.window_ms += raw;
        if self.window_ms >= FPS_WINDOW_MS {
            self.fps = f64::from(self.frame_count) / self.window_ms * 1000.0;
            self.frame_count = 0;
            self.window_ms = 0.0;
        }
    }

    fn plan(&self, fixed_steps: u32) -> FramePlan {
        let alpha = (self.accumulator / self.step_ms) as f32;
        FramePlan {
            fixed_steps,
            // f64 -> f32 rounding can land exactly on 1.0
            render_interpolation: alpha.clamp(0.0, 1.0 - f32::EPSILON),
        }
    }
}

fn step_for_fps(fps: u32) -> Result<f64, SimError> {
    if !(MIN_FPS..=MAX_FPS).contains(&fps) {
        return Err(SimError::InvalidParameter {
            name: "target_fps",
            value: f64::from(fps),
        });
    }
    Ok(1000.0 / f64::from(fps))
}
