use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::clock::Clock;
use super::countdown::CountdownTimer;
use super::phase::Phase;
use crate::config::ScheduleConfig;

/// Resolved run lengths for each phase plus the tick granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    pub focus: Duration,
    pub short_break: Duration,
    pub long_break: Duration,
    pub tick: Duration,
}

impl PhaseDurations {
    pub fn for_phase(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Focus => self.focus,
            Phase::ShortBreak => self.short_break,
            Phase::LongBreak => self.long_break,
        }
    }
}

impl From<&ScheduleConfig> for PhaseDurations {
    fn from(schedule: &ScheduleConfig) -> Self {
        Self {
            focus: schedule.duration_for(Phase::Focus),
            short_break: schedule.duration_for(Phase::ShortBreak),
            long_break: schedule.duration_for(Phase::LongBreak),
            tick: schedule.tick_interval(),
        }
    }
}

impl From<ScheduleConfig> for PhaseDurations {
    fn from(schedule: ScheduleConfig) -> Self {
        Self::from(&schedule)
    }
}

/// Timer factory backed by settings: each phase gets a fresh countdown of
/// the configured length on `clock`.
pub fn factory_from_settings(
    durations: impl Into<PhaseDurations>,
    clock: Arc<dyn Clock>,
) -> impl FnMut(Phase, Phase) -> CountdownTimer {
    let durations = durations.into();
    move |phase, next| {
        let duration = durations.for_phase(phase);
        debug!(phase = %phase, next = %next, secs = duration.as_secs(), "building countdown");
        CountdownTimer::with_clock(duration, durations.tick, Arc::clone(&clock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{ManualClock, TimerState};

    #[test]
    fn builds_fresh_countdowns_with_configured_lengths() {
        let schedule = ScheduleConfig {
            focus_duration: 50,
            short_break: 10,
            long_break: 30,
            long_break_interval: 2,
            tick_seconds: 5,
        };
        let mut factory = factory_from_settings(schedule, Arc::new(ManualClock::new()));

        let focus = factory(Phase::Focus, Phase::ShortBreak);
        assert_eq!(focus.duration(), Duration::from_secs(50 * 60));
        assert_eq!(focus.tick_interval(), Duration::from_secs(5));
        assert_eq!(focus.state(), TimerState::Stopped);

        let long = factory(Phase::LongBreak, Phase::Focus);
        assert_eq!(long.duration(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn explicit_durations_override_minutes() {
        let durations = PhaseDurations {
            focus: Duration::from_secs(3),
            short_break: Duration::from_secs(1),
            long_break: Duration::from_secs(2),
            tick: Duration::from_millis(500),
        };
        let mut factory = factory_from_settings(durations, Arc::new(ManualClock::new()));
        let short = factory(Phase::ShortBreak, Phase::Focus);
        assert_eq!(short.duration(), Duration::from_secs(1));
        assert_eq!(short.total_ticks(), 2);
    }
}
