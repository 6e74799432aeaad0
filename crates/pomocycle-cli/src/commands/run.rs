use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use pomocycle_core::driver::{self, Control, Controller};
use pomocycle_core::{
    factory_from_settings, Config, CycleError, CycleStatus, Observer, ObserverResult, Phase,
    PhaseDurations, PomodoroTimer, ScheduleConfig, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing::info;

use crate::output::{self, EventPrinter, Format};

#[derive(Args)]
pub struct RunArgs {
    /// Phase to begin with (focus, short-break, long-break)
    #[arg(long)]
    phase: Option<Phase>,
    /// Focus length, e.g. "25m" (defaults to config)
    #[arg(long, value_parser = humantime::parse_duration)]
    focus: Option<Duration>,
    /// Short break length, e.g. "5m"
    #[arg(long = "short", value_parser = humantime::parse_duration)]
    short_break: Option<Duration>,
    /// Long break length, e.g. "15m"
    #[arg(long = "long", value_parser = humantime::parse_duration)]
    long_break: Option<Duration>,
    /// Focus intervals per long break; 0 disables long breaks
    #[arg(long)]
    interval: Option<u32>,
    /// Time between tick notifications, e.g. "1s"
    #[arg(long, value_parser = humantime::parse_duration)]
    tick: Option<Duration>,
    /// How often the timer is polled
    #[arg(long, value_parser = humantime::parse_duration, default_value = "250ms")]
    poll: Duration,
    /// Exit after this many phases have run out
    #[arg(long)]
    phases: Option<u32>,
    /// Emit one JSON object per event
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn durations(&self, schedule: &ScheduleConfig) -> PhaseDurations {
        let defaults = PhaseDurations::from(schedule);
        PhaseDurations {
            focus: self.focus.unwrap_or(defaults.focus),
            short_break: self.short_break.unwrap_or(defaults.short_break),
            long_break: self.long_break.unwrap_or(defaults.long_break),
            tick: self.tick.unwrap_or(defaults.tick),
        }
    }

    fn format(&self) -> Format {
        if self.json {
            Format::Json
        } else {
            Format::Text
        }
    }
}

/// Signals once a number of phases have expired.
struct PhaseLimit {
    remaining: u32,
    reached: Arc<Notify>,
}

impl Observer<CycleStatus> for PhaseLimit {
    fn on_expire(&mut self, _status: &CycleStatus) -> ObserverResult {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.reached.notify_one();
        }
        Ok(())
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(drive(args, config));
    // A pending stdin read must not hold up exit.
    runtime.shutdown_background();
    outcome
}

async fn drive(args: RunArgs, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let durations = args.durations(&config.schedule);
    let interval = args
        .interval
        .unwrap_or(config.schedule.long_break_interval);
    let format = args.format();

    let mut timer = PomodoroTimer::new(
        interval,
        factory_from_settings(durations, Arc::new(SystemClock)),
    );
    timer.observe(Box::new(EventPrinter::new(format)))?;

    let limit = match args.phases {
        Some(0) => return Ok(()),
        Some(count) => {
            let reached = Arc::new(Notify::new());
            timer.observe(Box::new(PhaseLimit {
                remaining: count,
                reached: Arc::clone(&reached),
            }))?;
            Some(reached)
        }
        None => None,
    };

    info!(
        focus_secs = durations.focus.as_secs(),
        interval, "starting pomodoro"
    );
    if format == Format::Text {
        eprintln!("commands: start [phase] | cycle | pause | resume | stop | status | quit");
    }
    timer.start(args.phase)?;

    let (controller, requests) = driver::channel(16);
    tokio::select! {
        outcome = driver::run(&mut timer, args.poll, requests) => outcome?,
        () = read_controls(controller, limit, format) => {}
    }
    Ok(())
}

async fn wait_for(limit: &Option<Arc<Notify>>) {
    match limit {
        Some(reached) => reached.notified().await,
        None => std::future::pending().await,
    }
}

/// Forward stdin commands to the driver until the user quits, the phase
/// limit is hit or Ctrl-C arrives. Closing stdin only stops reading.
async fn read_controls(controller: Controller, limit: Option<Arc<Notify>>, format: Format) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reading = true;

    loop {
        let control = tokio::select! {
            line = lines.next_line(), if reading => match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<Control>() {
                    Ok(control) => control,
                    Err(e) => {
                        eprintln!("error: {e}");
                        continue;
                    }
                },
                Ok(None) | Err(_) => {
                    reading = false;
                    continue;
                }
            },
            () = wait_for(&limit) => Control::Dispose,
            _ = tokio::signal::ctrl_c() => Control::Dispose,
        };

        match controller.send(control).await {
            Ok(status) if control == Control::Status => {
                if let Err(e) = output::print(format, "status", &status) {
                    eprintln!("error: {e}");
                }
            }
            Ok(_) => {}
            Err(CycleError::Disposed) => return,
            Err(e) => eprintln!("error: {e}"),
        }

        if control == Control::Dispose {
            return;
        }
    }
}
