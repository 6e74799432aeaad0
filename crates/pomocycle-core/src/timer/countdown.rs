//! Countdown timer.
//!
//! A single run of fixed length. The timer owns no thread; the caller polls
//! [`CountdownTimer::tick`] from whatever scheduler it has, and every poll
//! recomputes elapsed time from the clock.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Running <-> Paused
//! Running | Paused -> Stopped
//! Running -> Expired
//! ```
//!
//! Elapsed time is banked on pause and measured from the last resume while
//! running, so neither the polling cadence nor any number of pause/resume
//! cycles moves the expiration instant.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::error::TimerError;
use crate::events::{TimerEvent, TimerSnapshot};
use crate::observer::{Observer, ObserverId, ObserverSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
    Expired,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimerState::Stopped => "stopped",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Expired => "expired",
        })
    }
}

const MIN_TICK: Duration = Duration::from_millis(1);

pub struct CountdownTimer {
    duration: Duration,
    tick_interval: Duration,
    state: TimerState,
    /// Elapsed time accumulated before the current running segment.
    banked: Duration,
    /// Start of the current running segment. `Some` only while running.
    resumed_at: Option<Instant>,
    ticks_emitted: u64,
    started: bool,
    clock: Arc<dyn Clock>,
    observers: ObserverSet<TimerSnapshot>,
}

impl CountdownTimer {
    /// Create a stopped timer on the system clock.
    ///
    /// A zero `tick_interval` is raised to one millisecond.
    pub fn new(duration: Duration, tick_interval: Duration) -> Self {
        Self::with_clock(duration, tick_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(duration: Duration, tick_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            duration,
            tick_interval: tick_interval.max(MIN_TICK),
            state: TimerState::Stopped,
            banked: Duration::ZERO,
            resumed_at: None,
            ticks_emitted: 0,
            started: false,
            clock,
            observers: ObserverSet::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    /// Elapsed time as of now, capped at `duration`.
    pub fn elapsed(&self) -> Duration {
        let live = self
            .resumed_at
            .map(|since| self.clock.now().saturating_duration_since(since))
            .unwrap_or_default();
        (self.banked + live).min(self.duration)
    }

    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.elapsed())
    }

    /// Number of ticks a full run emits: one per whole tick interval.
    pub fn total_ticks(&self) -> u64 {
        (self.duration.as_nanos() / self.tick_interval.as_nanos()) as u64
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshot_at(self.elapsed())
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn observe(&mut self, observer: Box<dyn Observer<TimerSnapshot>>) -> ObserverId {
        self.observers.observe(observer)
    }

    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        self.observers.unobserve(id)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the run. Only a timer that has never been started may start.
    pub fn start(&mut self) -> Result<TimerEvent, TimerError> {
        if self.started {
            return Err(self.rejected("start"));
        }
        self.started = true;
        self.state = TimerState::Running;
        self.resumed_at = Some(self.clock.now());
        debug!(duration_ms = self.duration.as_millis() as u64, "countdown started");
        Ok(self.emit(TimerEvent::Started(self.snapshot())))
    }

    /// Pause a running timer. A deadline that passed since the last poll
    /// is settled first, so the call is rejected with `Expired` state.
    pub fn pause(&mut self) -> Result<TimerEvent, TimerError> {
        self.settle();
        if self.state != TimerState::Running {
            return Err(self.rejected("pause"));
        }
        self.banked = self.elapsed();
        self.resumed_at = None;
        self.state = TimerState::Paused;
        debug!(elapsed_ms = self.banked.as_millis() as u64, "countdown paused");
        Ok(self.emit(TimerEvent::Paused(self.snapshot())))
    }

    pub fn resume(&mut self) -> Result<TimerEvent, TimerError> {
        if self.state != TimerState::Paused {
            return Err(self.rejected("resume"));
        }
        self.resumed_at = Some(self.clock.now());
        self.state = TimerState::Running;
        debug!(elapsed_ms = self.banked.as_millis() as u64, "countdown resumed");
        Ok(self.emit(TimerEvent::Resumed(self.snapshot())))
    }

    /// Stop a running or paused timer. Like [`pause`](Self::pause), an
    /// unpolled deadline expires the timer instead.
    pub fn stop(&mut self) -> Result<TimerEvent, TimerError> {
        self.settle();
        if !matches!(self.state, TimerState::Running | TimerState::Paused) {
            return Err(self.rejected("stop"));
        }
        self.banked = self.elapsed();
        self.resumed_at = None;
        self.state = TimerState::Stopped;
        debug!(elapsed_ms = self.banked.as_millis() as u64, "countdown stopped");
        Ok(self.emit(TimerEvent::Stopped(self.snapshot())))
    }

    /// Poll the timer. Emits one `Ticked` per tick boundary crossed since the
    /// last poll, then `Expired` once remaining time reaches zero. Polling a
    /// timer that is not running returns nothing.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if self.state != TimerState::Running {
            return Vec::new();
        }

        let elapsed = self.elapsed();
        let due = ((elapsed.as_nanos() / self.tick_interval.as_nanos()) as u64)
            .min(self.total_ticks());

        let mut events = Vec::new();
        while self.ticks_emitted < due {
            self.ticks_emitted += 1;
            let boundary = self.tick_boundary(self.ticks_emitted);
            events.push(self.emit(TimerEvent::Ticked(self.snapshot_at(boundary))));
        }

        if elapsed >= self.duration {
            self.banked = self.duration;
            self.resumed_at = None;
            self.state = TimerState::Expired;
            debug!(ticks = self.ticks_emitted, "countdown expired");
            events.push(self.emit(TimerEvent::Expired(self.snapshot())));
        }

        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Emit whatever a poll right now would, so a command never lands on a
    /// run whose time is already up.
    fn settle(&mut self) {
        if self.state == TimerState::Running && self.elapsed() >= self.duration {
            self.tick();
        }
    }

    fn emit(&mut self, event: TimerEvent) -> TimerEvent {
        self.observers.notify(event.kind(), event.snapshot());
        event
    }

    fn rejected(&self, action: &'static str) -> TimerError {
        TimerError::InvalidTransition {
            action,
            state: self.state,
        }
    }

    fn tick_boundary(&self, k: u64) -> Duration {
        let nanos = self.tick_interval.as_nanos().saturating_mul(k as u128);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn snapshot_at(&self, elapsed: Duration) -> TimerSnapshot {
        let remaining = self.duration.saturating_sub(elapsed);
        TimerSnapshot {
            state: self.state,
            duration_ms: self.duration.as_millis() as u64,
            tick_interval_ms: self.tick_interval.as_millis() as u64,
            elapsed_ms: elapsed.as_millis() as u64,
            remaining_ms: remaining.as_millis() as u64,
            remaining_rounded_ms: round_to_tick(remaining, self.tick_interval).as_millis() as u64,
            ticks: self.ticks_emitted,
            at: Utc::now(),
        }
    }
}

/// Round `remaining` to the nearest multiple of `tick` (halves round up).
fn round_to_tick(remaining: Duration, tick: Duration) -> Duration {
    let t = tick.as_nanos();
    let steps = (remaining.as_nanos() + t / 2) / t;
    Duration::from_nanos(u64::try_from(steps.saturating_mul(t)).unwrap_or(u64::MAX))
}

impl fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("duration", &self.duration)
            .field("tick_interval", &self.tick_interval)
            .field("state", &self.state)
            .field("elapsed", &self.elapsed())
            .field("ticks_emitted", &self.ticks_emitted)
            .field("observers", &self.observers)
            .finish()
    }
}
