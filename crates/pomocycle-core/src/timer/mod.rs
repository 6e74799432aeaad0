mod clock;
mod countdown;
mod factory;
mod phase;
mod pomodoro;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{CountdownTimer, TimerState};
pub use factory::{factory_from_settings, PhaseDurations};
pub use phase::Phase;
pub use pomodoro::{PomodoroTimer, TimerFactory};
