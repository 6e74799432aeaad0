//! # Pomocycle Core Library
//!
//! Timer and phase-sequencing engine for the Pomodoro technique.
//!
//! ## Architecture
//!
//! - **Countdown Timer**: a wall-clock-based state machine for a single run.
//!   It owns no thread; the caller polls `tick()` and every poll recomputes
//!   elapsed time from a [`Clock`].
//! - **Pomodoro Timer**: sequences Focus, Short Break and Long Break phases,
//!   counting completed focus intervals toward the long break and building
//!   a fresh countdown per phase through an injected factory.
//! - **Observers**: capability-style callbacks fanned out synchronously in
//!   registration order, with failing observers isolated.
//! - **Driver**: a tokio interval that polls the engine and serves control
//!   requests from a channel.
//!
//! ## Key Components
//!
//! - [`CountdownTimer`]: single-run countdown
//! - [`PomodoroTimer`]: phase sequencer
//! - [`Observer`]: lifecycle callbacks
//! - [`Config`]: phase durations and cycle settings

pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod observer;
pub mod timer;

pub use config::{Config, ScheduleConfig};
pub use error::{ConfigError, CoreError, CycleError, TimerError};
pub use events::{CycleStatus, TimerEvent, TimerSnapshot};
pub use observer::{EventKind, Observer, ObserverError, ObserverId, ObserverResult, ObserverSet};
pub use timer::{
    factory_from_settings, Clock, CountdownTimer, ManualClock, Phase, PhaseDurations,
    PomodoroTimer, SystemClock, TimerFactory, TimerState,
};
