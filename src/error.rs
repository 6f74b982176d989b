//! Error types for the simulation core and its collaborators
//!
//! Geometry and pooling errors are rejected at the call site. Scheduler
//! failures are absorbed into the scheduler's `Errored` state and surfaced as
//! events; nothing here is meant to take down the host.

use thiserror::Error;

/// Errors raised by the simulation core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// No wave configuration exists for the requested wave number
    #[error("no configuration for wave {wave}")]
    ConfigMissing { wave: u32 },

    /// A pattern or setting parameter violates its precondition
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Blend weights do not sum to 1
    #[error("pattern weights sum to {sum}, expected 1.0")]
    InvalidWeights { sum: f32 },

    /// A bounded pool had no free instance
    #[error("pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },

    /// A sprite or sound failed to load
    #[error("failed to load resource `{id}`: {reason}")]
    ResourceLoadFailure { id: String, reason: String },

    /// `start_wave` called while a wave is still running
    #[error("wave {wave} is still active")]
    WaveActive { wave: u32 },

    /// The scheduler is in its terminal failure state
    #[error("wave scheduler has errored and no longer accepts commands")]
    SchedulerErrored,

    /// Structurally invalid configuration (empty lists, zero counts)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised by key-value storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable")]
    Unavailable,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failure reported by a render sink; always treated as non-fatal
#[derive(Debug, Clone, Error)]
#[error("render failed: {0}")]
pub struct RenderError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SimError::ConfigMissing { wave: 7 }.to_string(),
            "no configuration for wave 7"
        );
        assert_eq!(
            SimError::PoolExhausted { capacity: 100 }.to_string(),
            "pool exhausted (capacity 100)"
        );
        let err: StorageError = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(matches!(err, StorageError::Serde(_)));
    }
}
