//! Pomodoro phase sequencer.
//!
//! Owns the Focus → ShortBreak/LongBreak → Focus rotation. Each phase runs
//! on a fresh [`CountdownTimer`] obtained from the injected factory; when a
//! countdown expires the next phase is chosen and started before `tick`
//! returns, so cycling needs no caller intervention.
//!
//! Every countdown event is forwarded to pomodoro observers as the matching
//! callback followed by `on_change`.

use std::fmt;

use tracing::{debug, info};

use super::countdown::{CountdownTimer, TimerState};
use super::phase::Phase;
use crate::error::{CycleError, TimerError};
use crate::events::{CycleStatus, TimerEvent};
use crate::observer::{EventKind, Observer, ObserverId, ObserverSet};

/// Builds the countdown for a phase. The second argument is the phase that
/// will follow it, so callers can prepare wording such as "long break next".
pub type TimerFactory = Box<dyn FnMut(Phase, Phase) -> CountdownTimer>;

pub struct PomodoroTimer {
    phase: Phase,
    long_break_interval: u32,
    focus_count: u32,
    factory: TimerFactory,
    timer: Option<CountdownTimer>,
    observers: ObserverSet<CycleStatus>,
    disposed: bool,
}

impl PomodoroTimer {
    /// Create an idle sequencer positioned at Focus.
    ///
    /// `long_break_interval` is the number of focus intervals before a long
    /// break; 0 disables long breaks.
    pub fn new<F>(long_break_interval: u32, factory: F) -> Self
    where
        F: FnMut(Phase, Phase) -> CountdownTimer + 'static,
    {
        Self {
            phase: Phase::Focus,
            long_break_interval,
            focus_count: 0,
            factory: Box::new(factory),
            timer: None,
            observers: ObserverSet::new(),
            disposed: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// State of the active countdown; `Stopped` when there is none.
    pub fn state(&self) -> TimerState {
        self.timer
            .as_ref()
            .map(CountdownTimer::state)
            .unwrap_or(TimerState::Stopped)
    }

    pub fn is_running(&self) -> bool {
        self.state() == TimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state() == TimerState::Paused
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn focus_count(&self) -> u32 {
        self.focus_count
    }

    pub fn long_break_interval(&self) -> u32 {
        self.long_break_interval
    }

    /// Focus intervals still to complete before the next long break.
    /// 0 when long breaks are disabled or one is already due.
    pub fn long_break_pomodoros(&self) -> u32 {
        let interval = self.long_break_interval;
        if interval == 0 {
            return 0;
        }
        let done = self.focus_count % interval;
        if done == 0 && self.focus_count > 0 {
            return 0;
        }
        interval - done
    }

    /// The phase that follows the current one if it runs to completion.
    pub fn next_phase(&self) -> Phase {
        self.phase_following(self.phase, self.focus_count)
    }

    pub fn status(&self) -> CycleStatus {
        CycleStatus {
            phase: self.phase,
            next_phase: self.next_phase(),
            state: self.state(),
            focus_count: self.focus_count,
            long_break_interval: self.long_break_interval,
            long_break_pomodoros: self.long_break_pomodoros(),
            timer: self.timer.as_ref().map(CountdownTimer::snapshot),
        }
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn observe(
        &mut self,
        observer: Box<dyn Observer<CycleStatus>>,
    ) -> Result<ObserverId, CycleError> {
        self.ensure_live()?;
        Ok(self.observers.observe(observer))
    }

    pub fn unobserve(&mut self, id: ObserverId) -> Result<bool, CycleError> {
        self.ensure_live()?;
        Ok(self.observers.unobserve(id))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a phase.
    ///
    /// With `Some(phase)`, any running or paused countdown is stopped and
    /// `phase` begins fresh; the focus count is left alone. With `None`, a
    /// paused countdown resumes, a running one is left as is, and otherwise
    /// the current phase begins fresh.
    ///
    /// The active countdown is polled first, so a phase whose time ran out
    /// since the last `tick` expires and is counted before anything else.
    pub fn start(&mut self, phase: Option<Phase>) -> Result<(), CycleError> {
        self.ensure_live()?;
        self.tick()?;
        match phase {
            Some(phase) => {
                let focus_count = self.focus_count;
                let (timer, event) = self.launch(phase, focus_count)?;
                self.halt_active()?;
                self.commit(phase, focus_count, timer, &event);
                Ok(())
            }
            None => match self.timer.as_ref().map(CountdownTimer::state) {
                Some(TimerState::Running) => Ok(()),
                Some(TimerState::Paused) => self.resume(),
                _ => self.begin(self.phase, self.focus_count),
            },
        }
    }

    /// Jump straight into a new Focus phase without touching the focus count.
    pub fn start_cycle(&mut self) -> Result<(), CycleError> {
        self.ensure_live()?;
        info!(focus_count = self.focus_count, "starting new cycle");
        self.start(Some(Phase::Focus))
    }

    pub fn pause(&mut self) -> Result<(), CycleError> {
        self.delegate("pause", CountdownTimer::pause)
    }

    pub fn resume(&mut self) -> Result<(), CycleError> {
        self.delegate("resume", CountdownTimer::resume)
    }

    pub fn stop(&mut self) -> Result<(), CycleError> {
        self.delegate("stop", CountdownTimer::stop)
    }

    /// Poll the active countdown. On expiry the next phase is chosen and
    /// its countdown started before returning.
    pub fn tick(&mut self) -> Result<(), CycleError> {
        self.ensure_live()?;
        let Some(timer) = self.timer.as_mut() else {
            return Ok(());
        };
        let events = timer.tick();
        // An active countdown left in `Expired` means an earlier advance
        // failed; retry it.
        let expired =
            events.iter().any(TimerEvent::is_expired) || timer.state() == TimerState::Expired;
        for event in &events {
            self.forward(event);
        }
        if expired {
            self.advance()?;
        }
        Ok(())
    }

    /// Poll once, stop the active countdown and detach every observer. Any
    /// later call fails with [`CycleError::Disposed`].
    pub fn dispose(&mut self) -> Result<(), CycleError> {
        self.ensure_live()?;
        self.tick()?;
        self.halt_active()?;
        self.timer = None;
        self.observers.clear();
        self.disposed = true;
        debug!("pomodoro timer disposed");
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_live(&self) -> Result<(), CycleError> {
        if self.disposed {
            return Err(CycleError::Disposed);
        }
        Ok(())
    }

    /// Poll, then apply `action` to the active countdown. If the poll found
    /// the phase already over, the expiry and the next phase win and the
    /// action is rejected.
    fn delegate(
        &mut self,
        name: &'static str,
        action: fn(&mut CountdownTimer) -> Result<TimerEvent, TimerError>,
    ) -> Result<(), CycleError> {
        self.ensure_live()?;
        if self.timer.is_none() {
            return Err(CycleError::NoActiveTimer);
        }
        let phase = self.phase;
        self.tick()?;
        if self.phase != phase {
            return Err(TimerError::InvalidTransition {
                action: name,
                state: TimerState::Expired,
            }
            .into());
        }

        let timer = self.timer.as_mut().ok_or(CycleError::NoActiveTimer)?;
        let event = action(timer)?;
        self.forward(&event);
        Ok(())
    }

    /// Stop the active countdown if it is still live. Callers poll first,
    /// so the countdown cannot be past its deadline here.
    fn halt_active(&mut self) -> Result<(), CycleError> {
        let Some(timer) = self.timer.as_mut() else {
            return Ok(());
        };
        if !matches!(timer.state(), TimerState::Running | TimerState::Paused) {
            return Ok(());
        }
        let event = timer.stop()?;
        self.forward(&event);
        Ok(())
    }

    fn long_break_due(&self, completed_focus: u32) -> bool {
        self.long_break_interval > 0 && completed_focus % self.long_break_interval == 0
    }

    /// Phase that follows `phase`, given the focus count while it runs.
    fn phase_following(&self, phase: Phase, focus_count: u32) -> Phase {
        match phase {
            Phase::Focus if self.long_break_due(focus_count + 1) => Phase::LongBreak,
            Phase::Focus => Phase::ShortBreak,
            Phase::ShortBreak | Phase::LongBreak => Phase::Focus,
        }
    }

    /// Apply the transition rule after the current phase expired.
    fn advance(&mut self) -> Result<(), CycleError> {
        let completed = self.phase;
        let (next, focus_count) = match completed {
            Phase::Focus => {
                let count = self.focus_count + 1;
                if self.long_break_due(count) {
                    (Phase::LongBreak, 0)
                } else {
                    (Phase::ShortBreak, count)
                }
            }
            Phase::ShortBreak => (Phase::Focus, self.focus_count),
            Phase::LongBreak => (Phase::Focus, 0),
        };
        info!(
            completed = %completed,
            next = %next,
            focus_count,
            "phase complete"
        );
        self.begin(next, focus_count)
    }

    /// Build and start a countdown for `phase` and make it active.
    fn begin(&mut self, phase: Phase, focus_count: u32) -> Result<(), CycleError> {
        let (timer, event) = self.launch(phase, focus_count)?;
        self.commit(phase, focus_count, timer, &event);
        Ok(())
    }

    /// Build and start a countdown without touching sequencer state.
    fn launch(
        &mut self,
        phase: Phase,
        focus_count: u32,
    ) -> Result<(CountdownTimer, TimerEvent), CycleError> {
        let after = self.phase_following(phase, focus_count);
        let mut timer = (self.factory)(phase, after);
        let event = timer.start()?;
        Ok((timer, event))
    }

    fn commit(
        &mut self,
        phase: Phase,
        focus_count: u32,
        timer: CountdownTimer,
        event: &TimerEvent,
    ) {
        self.phase = phase;
        self.focus_count = focus_count;
        self.timer = Some(timer);
        debug!(phase = %phase, next = %self.next_phase(), "phase started");
        self.forward(event);
    }

    /// Notify the matching callback, then `on_change`. The status carries
    /// the event's own snapshot and state.
    fn forward(&mut self, event: &TimerEvent) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = event.snapshot();
        let mut status = self.status();
        status.state = snapshot.state;
        status.timer = Some(snapshot.clone());
        self.observers.notify(event.kind(), &status);
        self.observers.notify(EventKind::Change, &status);
    }
}

impl fmt::Debug for PomodoroTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PomodoroTimer")
            .field("phase", &self.phase)
            .field("long_break_interval", &self.long_break_interval)
            .field("focus_count", &self.focus_count)
            .field("timer", &self.timer)
            .field("observers", &self.observers)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}
