//! Platform abstraction layer
//!
//! The simulation talks to the outside world only through these traits:
//! - Input: polled once per fixed update
//! - Audio: fire-and-forget sound ids
//! - Score: points reported with the reason they were earned
//! - Rendering: draw one item, failures are non-fatal
//! - Persistence: best score load/save, failures never propagate

#[cfg(target_arch = "wasm32")]
pub mod web;

use glam::Vec2;

use crate::error::RenderError;
use crate::sim::{ScoreEvent, Shape, TickInput};

/// Player actions the input source can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Fire,
    Pause,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::MoveUp,
        Action::MoveDown,
        Action::MoveLeft,
        Action::MoveRight,
        Action::Fire,
        Action::Pause,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Default keyboard binding (`KeyboardEvent.key` values)
    pub fn from_key(key: &str) -> Option<Action> {
        match key {
            "ArrowUp" | "w" | "W" => Some(Action::MoveUp),
            "ArrowDown" | "s" | "S" => Some(Action::MoveDown),
            "ArrowLeft" | "a" | "A" => Some(Action::MoveLeft),
            "ArrowRight" | "d" | "D" => Some(Action::MoveRight),
            " " | "j" | "J" => Some(Action::Fire),
            "Escape" | "p" | "P" => Some(Action::Pause),
            _ => None,
        }
    }
}

pub trait InputSource {
    fn is_action_active(&self, action: Action) -> bool;
}

/// Held-action bitset, updated by key events and read by the game loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    held: u8,
}

impl InputState {
    pub fn press(&mut self, action: Action) {
        self.held |= action.bit();
    }

    pub fn release(&mut self, action: Action) {
        self.held &= !action.bit();
    }

    pub fn set(&mut self, action: Action, active: bool) {
        if active {
            self.press(action)
        } else {
            self.release(action)
        }
    }

    pub fn clear(&mut self) {
        self.held = 0;
    }
}

impl InputSource for InputState {
    fn is_action_active(&self, action: Action) -> bool {
        self.held & action.bit() != 0
    }
}

/// Sample the input source into one step's commands
pub fn poll(input: &dyn InputSource) -> TickInput {
    let axis = |neg: Action, pos: Action| {
        let mut v = 0.0;
        if input.is_action_active(neg) {
            v -= 1.0;
        }
        if input.is_action_active(pos) {
            v += 1.0;
        }
        v
    };
    TickInput {
        movement: Vec2::new(
            axis(Action::MoveLeft, Action::MoveRight),
            axis(Action::MoveUp, Action::MoveDown),
        ),
        fire: input.is_action_active(Action::Fire),
        pause: input.is_action_active(Action::Pause),
    }
}

pub trait AudioSink {
    /// Unknown ids are ignored with a warning
    fn play_sound(&mut self, id: &str);
}

/// Owner of the running score. The simulation only reports events.
pub trait ScoreSink {
    fn add_points(&mut self, amount: u64, event: ScoreEvent);
    fn current_score(&self) -> u64;
}

/// Everything a renderer needs to draw one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem<'a> {
    /// Interpolated center
    pub pos: Vec2,
    pub shape: Shape,
    /// Facing in radians, taken from the direction of travel
    pub heading: f32,
    pub sprite: &'a str,
    pub frame: u32,
}

pub trait RenderSink {
    /// Called before the first item of a frame
    fn begin(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn draw(&mut self, item: &RenderItem<'_>) -> Result<(), RenderError>;
}

/// Best-score storage. Implementations swallow and log their own failures.
pub trait PersistenceSink {
    /// Stored best score, 0 when nothing could be read
    fn load_high_score(&self) -> u64;
    fn save_high_score(&mut self, score: u64, wave: u32);
}

/// Wall-clock milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Wall-clock milliseconds since the Unix epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_state_bits() {
        let mut input = InputState::default();
        input.press(Action::Fire);
        input.press(Action::MoveLeft);
        assert!(input.is_action_active(Action::Fire));
        assert!(input.is_action_active(Action::MoveLeft));
        assert!(!input.is_action_active(Action::Pause));

        input.release(Action::Fire);
        assert!(!input.is_action_active(Action::Fire));
        input.clear();
        assert!(Action::ALL.iter().all(|a| !input.is_action_active(*a)));
    }

    #[test]
    fn test_poll_builds_movement() {
        let mut input = InputState::default();
        input.press(Action::MoveRight);
        input.press(Action::MoveUp);
        input.press(Action::Fire);
        let tick = poll(&input);
        assert_eq!(tick.movement, Vec2::new(1.0, -1.0));
        assert!(tick.fire);
        assert!(!tick.pause);

        // Opposite directions cancel
        input.press(Action::MoveLeft);
        assert_eq!(poll(&input).movement.x, 0.0);
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(Action::from_key("ArrowLeft"), Some(Action::MoveLeft));
        assert_eq!(Action::from_key(" "), Some(Action::Fire));
        assert_eq!(Action::from_key("Escape"), Some(Action::Pause));
        assert_eq!(Action::from_key("q"), None);
    }
}
