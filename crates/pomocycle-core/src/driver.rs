//! Tokio tick driver.
//!
//! The engine itself never waits. This module supplies the external
//! scheduler: an interval that polls [`PomodoroTimer::tick`], interleaved
//! with control requests arriving on a channel. Everything runs on the
//! task that awaits [`run`], so the timer and its observers never need to
//! be `Send`.

use std::str::FromStr;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::CycleError;
use crate::events::CycleStatus;
use crate::timer::{Phase, PomodoroTimer};

/// A command for the pomodoro timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start(Option<Phase>),
    StartCycle,
    Pause,
    Resume,
    Stop,
    Status,
    Dispose,
}

impl FromStr for Control {
    type Err = String;

    /// Parses `start [phase]`, `cycle`, `pause`, `resume`, `stop`,
    /// `status` and `quit`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().ok_or_else(|| "empty command".to_string())?;
        let argument = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments: {s}"));
        }

        let control = match (command.to_ascii_lowercase().as_str(), argument) {
            ("start", phase) => Control::Start(phase.map(str::parse::<Phase>).transpose()?),
            ("cycle", None) => Control::StartCycle,
            ("pause", None) => Control::Pause,
            ("resume", None) => Control::Resume,
            ("stop", None) => Control::Stop,
            ("status", None) => Control::Status,
            ("quit" | "exit" | "dispose", None) => Control::Dispose,
            (other, None) => return Err(format!("unknown command: {other}")),
            (other, Some(_)) => return Err(format!("{other} takes no argument")),
        };
        Ok(control)
    }
}

/// A control plus the channel its outcome is reported on.
#[derive(Debug)]
pub struct Request {
    pub control: Control,
    pub reply: oneshot::Sender<Result<CycleStatus, CycleError>>,
}

/// Sending half of a driver's control channel.
#[derive(Debug, Clone)]
pub struct Controller {
    tx: mpsc::Sender<Request>,
}

impl Controller {
    /// Send `control` and wait for the outcome. A driver that has already
    /// exited reports [`CycleError::Disposed`].
    pub async fn send(&self, control: Control) -> Result<CycleStatus, CycleError> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(Request { control, reply })
            .await
            .map_err(|_| CycleError::Disposed)?;
        outcome.await.map_err(|_| CycleError::Disposed)?
    }
}

pub fn channel(capacity: usize) -> (Controller, mpsc::Receiver<Request>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Controller { tx }, rx)
}

/// Apply one control to the timer and report the resulting status.
pub fn apply(timer: &mut PomodoroTimer, control: Control) -> Result<CycleStatus, CycleError> {
    match control {
        Control::Start(phase) => timer.start(phase)?,
        Control::StartCycle => timer.start_cycle()?,
        Control::Pause => timer.pause()?,
        Control::Resume => timer.resume()?,
        Control::Stop => timer.stop()?,
        Control::Status => {}
        Control::Dispose => timer.dispose()?,
    }
    Ok(timer.status())
}

/// Poll `timer` every `poll_every` and serve control requests until the
/// channel closes or the timer is disposed.
///
/// Missed polls are delayed rather than burst; the countdown recomputes
/// elapsed time from its clock, so late polls only delay notifications.
pub async fn run(
    timer: &mut PomodoroTimer,
    poll_every: Duration,
    mut requests: mpsc::Receiver<Request>,
) -> Result<(), CycleError> {
    let mut ticker = interval(poll_every.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(poll_ms = poll_every.as_millis() as u64, "driver started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !timer.is_disposed() {
                    timer.tick()?;
                }
            }
            request = requests.recv() => {
                let Some(Request { control, reply }) = request else {
                    debug!("control channel closed");
                    return Ok(());
                };
                let outcome = apply(timer, control);
                if let Err(e) = &outcome {
                    warn!(?control, error = %e, "control rejected");
                }
                let _ = reply.send(outcome);
            }
        }

        if timer.is_disposed() {
            info!("driver stopped");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScheduleConfig;
    use crate::timer::{factory_from_settings, SystemClock, TimerState};
    use std::sync::Arc;

    fn one_minute_phases() -> PomodoroTimer {
        let schedule = ScheduleConfig {
            focus_duration: 1,
            short_break: 1,
            long_break: 2,
            long_break_interval: 2,
            tick_seconds: 1,
        };
        PomodoroTimer::new(
            schedule.long_break_interval,
            factory_from_settings(schedule, Arc::new(SystemClock)),
        )
    }

    #[test]
    fn parses_controls() {
        assert_eq!("start".parse::<Control>(), Ok(Control::Start(None)));
        assert_eq!(
            "start long".parse::<Control>(),
            Ok(Control::Start(Some(Phase::LongBreak)))
        );
        assert_eq!(" PAUSE ".parse::<Control>(), Ok(Control::Pause));
        assert_eq!("cycle".parse::<Control>(), Ok(Control::StartCycle));
        assert_eq!("quit".parse::<Control>(), Ok(Control::Dispose));
        assert!("start nap".parse::<Control>().is_err());
        assert!("pause now".parse::<Control>().is_err());
        assert!("".parse::<Control>().is_err());
    }

    #[test]
    fn apply_reports_status_after_control() {
        let mut timer = one_minute_phases();
        let status = apply(&mut timer, Control::Start(Some(Phase::ShortBreak))).unwrap();
        assert_eq!(status.phase, Phase::ShortBreak);
        assert_eq!(status.state, TimerState::Running);
        let err = apply(&mut timer, Control::Resume).unwrap_err();
        assert_eq!(err.to_string(), "cannot resume a timer that is running");
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_phases_on_tokio_time() {
        let mut timer = one_minute_phases();
        let (controller, requests) = channel(8);

        let script = async move {
            let status = controller.send(Control::Start(None)).await.unwrap();
            assert_eq!(status.phase, Phase::Focus);

            tokio::time::sleep(Duration::from_secs(90)).await;
            let status = controller.send(Control::Status).await.unwrap();
            assert_eq!(status.phase, Phase::ShortBreak);
            assert_eq!(status.focus_count, 1);
            assert_eq!(status.next_phase, Phase::Focus);

            let err = controller.send(Control::Resume).await.unwrap_err();
            assert!(matches!(err, CycleError::Timer(_)));

            controller.send(Control::Dispose).await.unwrap();
            assert_eq!(
                controller.send(Control::Status).await.unwrap_err(),
                CycleError::Disposed
            );
        };

        let (outcome, ()) = tokio::join!(run(&mut timer, Duration::from_millis(500), requests), script);
        outcome.unwrap();
        assert!(timer.is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_channel_ends_the_driver() {
        let mut timer = one_minute_phases();
        let (controller, requests) = channel(1);
        drop(controller);
        run(&mut timer, Duration::from_secs(1), requests).await.unwrap();
        assert!(!timer.is_disposed());
    }
}
