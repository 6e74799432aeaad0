//! Console rendering of pomodoro events.

use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};
use pomocycle_core::{CycleStatus, EventKind, Observer, ObserverResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct Line<'a> {
    event: &'a str,
    at: DateTime<Utc>,
    #[serde(flatten)]
    status: &'a CycleStatus,
}

/// `mm:ss`, with minutes allowed past 59.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn render_text(label: &str, status: &CycleStatus) -> String {
    let (clock, percent) = match &status.timer {
        Some(t) => (
            format_clock(t.remaining_secs()),
            format!("{:>3.0}%", t.progress() * 100.0),
        ),
        None => ("--:--".into(), "   -".into()),
    };
    let at = status
        .timer
        .as_ref()
        .map(|t| t.at)
        .unwrap_or_else(Utc::now)
        .with_timezone(&Local);

    let mut line = format!(
        "[{}] {label:<7} {:<11} {clock} {percent}  next: {}",
        at.format("%H:%M:%S"),
        status.phase.label(),
        status.next_phase.label(),
    );
    if status.long_break_interval > 0 {
        line.push_str(&format!(
            "  ({}/{} focus)",
            status.focus_count, status.long_break_interval
        ));
    }
    if label == "expire" {
        line.push_str(if status.phase.is_break() {
            "  back to work"
        } else {
            "  take a break"
        });
    }
    line
}

pub fn render_json(label: &str, status: &CycleStatus) -> serde_json::Result<String> {
    let at = status.timer.as_ref().map(|t| t.at).unwrap_or_else(Utc::now);
    serde_json::to_string(&Line {
        event: label,
        at,
        status,
    })
}

/// Write one line describing `status` to stdout.
pub fn print(format: Format, label: &str, status: &CycleStatus) -> ObserverResult {
    let line = match format {
        Format::Text => render_text(label, status),
        Format::Json => render_json(label, status)?,
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}

/// Prints every lifecycle event. Change notifications are skipped since
/// each one duplicates the event it follows.
pub struct EventPrinter {
    format: Format,
}

impl EventPrinter {
    pub fn new(format: Format) -> Self {
        Self { format }
    }

    fn emit(&self, kind: EventKind, status: &CycleStatus) -> ObserverResult {
        print(self.format, kind.as_str(), status)
    }
}

impl Observer<CycleStatus> for EventPrinter {
    fn on_start(&mut self, status: &CycleStatus) -> ObserverResult {
        self.emit(EventKind::Start, status)
    }

    fn on_tick(&mut self, status: &CycleStatus) -> ObserverResult {
        self.emit(EventKind::Tick, status)
    }

    fn on_pause(&mut self, status: &CycleStatus) -> ObserverResult {
        self.emit(EventKind::Pause, status)
    }

    fn on_resume(&mut self, status: &CycleStatus) -> ObserverResult {
        self.emit(EventKind::Resume, status)
    }

    fn on_stop(&mut self, status: &CycleStatus) -> ObserverResult {
        self.emit(EventKind::Stop, status)
    }

    fn on_expire(&mut self, status: &CycleStatus) -> ObserverResult {
        self.emit(EventKind::Expire, status)
    }
}
