//! Core error types for pomocycle-core.
//!
//! Transition errors are programmer errors (calling an operation in a state
//! that does not permit it) and are surfaced to the immediate caller without
//! mutating anything. Observer failures never appear here: they are isolated
//! and logged by the dispatcher.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerState;

/// Core error type for pomocycle-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Countdown timer errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Phase sequencer errors
    #[error("Cycle error: {0}")]
    Cycle(#[from] CycleError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A countdown timer operation that its current state does not permit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("cannot {action} a timer that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: TimerState,
    },
}

/// Phase sequencer errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// The sequencer was disposed; the caller holds a stale reference.
    #[error("pomodoro timer has been disposed")]
    Disposed,

    /// There is no countdown to delegate to (nothing has been started yet).
    #[error("no active timer")]
    NoActiveTimer,

    #[error(transparent)]
    Timer(#[from] TimerError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_action_and_state() {
        let err = TimerError::InvalidTransition {
            action: "resume",
            state: TimerState::Running,
        };
        assert_eq!(err.to_string(), "cannot resume a timer that is running");
    }

    #[test]
    fn cycle_error_wraps_timer_error_transparently() {
        let err: CycleError = TimerError::InvalidTransition {
            action: "pause",
            state: TimerState::Paused,
        }
        .into();
        assert_eq!(err.to_string(), "cannot pause a timer that is paused");
    }

    #[test]
    fn core_error_from_config_error() {
        let err: CoreError = ConfigError::UnknownKey("schedule.nope".into()).into();
        assert!(err.to_string().contains("schedule.nope"));
    }
}
