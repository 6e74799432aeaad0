use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observer::EventKind;
use crate::timer::{Phase, TimerState};

/// Point-in-time view of a countdown timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub duration_ms: u64,
    pub tick_interval_ms: u64,
    /// Exact elapsed time; never rounded.
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    /// `remaining_ms` rounded to the nearest tick boundary, for display.
    pub remaining_rounded_ms: u64,
    /// Tick notifications emitted so far in this run.
    pub ticks: u64,
    pub at: DateTime<Utc>,
}

impl TimerSnapshot {
    /// Remaining time rounded to whole seconds, as shown on a badge.
    pub fn remaining_secs(&self) -> u64 {
        (self.remaining_rounded_ms + 500) / 1000
    }

    /// 0.0 .. 1.0 progress through the run.
    pub fn progress(&self) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (self.elapsed_ms as f64 / self.duration_ms as f64).min(1.0)
    }
}

/// Every countdown transition produces one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    Started(TimerSnapshot),
    Ticked(TimerSnapshot),
    Paused(TimerSnapshot),
    Resumed(TimerSnapshot),
    Stopped(TimerSnapshot),
    Expired(TimerSnapshot),
}

impl TimerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TimerEvent::Started(_) => EventKind::Start,
            TimerEvent::Ticked(_) => EventKind::Tick,
            TimerEvent::Paused(_) => EventKind::Pause,
            TimerEvent::Resumed(_) => EventKind::Resume,
            TimerEvent::Stopped(_) => EventKind::Stop,
            TimerEvent::Expired(_) => EventKind::Expire,
        }
    }

    pub fn snapshot(&self) -> &TimerSnapshot {
        match self {
            TimerEvent::Started(s)
            | TimerEvent::Ticked(s)
            | TimerEvent::Paused(s)
            | TimerEvent::Resumed(s)
            | TimerEvent::Stopped(s)
            | TimerEvent::Expired(s) => s,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, TimerEvent::Expired(_))
    }
}

/// What pomodoro observers receive: the phase bookkeeping plus the active
/// countdown's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStatus {
    pub phase: Phase,
    /// The phase that will follow `phase` if it runs to completion.
    pub next_phase: Phase,
    pub state: TimerState,
    pub focus_count: u32,
    pub long_break_interval: u32,
    pub long_break_pomodoros: u32,
    pub timer: Option<TimerSnapshot>,
}
