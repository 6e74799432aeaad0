//! Observer fan-out.
//!
//! An observer implements only the callbacks it cares about; every method
//! has a no-op default. Observers are held in registration order and each
//! notification is delivered to all of them, even if an earlier one fails.
//!
//! A failing callback (an `Err` or a panic) is logged and skipped. It can
//! never change timer state or stop delivery to the rest of the set.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Error returned by an observer callback.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

pub type ObserverResult = Result<(), ObserverError>;

/// Lifecycle callbacks. `T` is the payload type of the emitter
/// ([`crate::TimerSnapshot`] for a countdown, [`crate::CycleStatus`] for a
/// pomodoro timer).
pub trait Observer<T> {
    fn on_start(&mut self, _payload: &T) -> ObserverResult {
        Ok(())
    }

    fn on_tick(&mut self, _payload: &T) -> ObserverResult {
        Ok(())
    }

    fn on_pause(&mut self, _payload: &T) -> ObserverResult {
        Ok(())
    }

    fn on_resume(&mut self, _payload: &T) -> ObserverResult {
        Ok(())
    }

    fn on_stop(&mut self, _payload: &T) -> ObserverResult {
        Ok(())
    }

    fn on_expire(&mut self, _payload: &T) -> ObserverResult {
        Ok(())
    }

    /// Fired by the pomodoro timer after every other notification.
    /// Countdown timers never call it.
    fn on_change(&mut self, _payload: &T) -> ObserverResult {
        Ok(())
    }
}

/// Which callback a notification targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Tick,
    Pause,
    Resume,
    Stop,
    Expire,
    Change,
}

impl EventKind {
    fn deliver<T>(self, observer: &mut dyn Observer<T>, payload: &T) -> ObserverResult {
        match self {
            EventKind::Start => observer.on_start(payload),
            EventKind::Tick => observer.on_tick(payload),
            EventKind::Pause => observer.on_pause(payload),
            EventKind::Resume => observer.on_resume(payload),
            EventKind::Stop => observer.on_stop(payload),
            EventKind::Expire => observer.on_expire(payload),
            EventKind::Change => observer.on_change(payload),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Tick => "tick",
            EventKind::Pause => "pause",
            EventKind::Resume => "resume",
            EventKind::Stop => "stop",
            EventKind::Expire => "expire",
            EventKind::Change => "change",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`ObserverSet::observe`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Ordered collection of observers.
pub struct ObserverSet<T> {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn Observer<T>>)>,
}

impl<T> ObserverSet<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn observe(&mut self, observer: Box<dyn Observer<T>>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver `kind` to every observer in registration order.
    pub fn notify(&mut self, kind: EventKind, payload: &T) {
        for (id, observer) in &mut self.entries {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                kind.deliver(observer.as_mut(), payload)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(observer = id.0, event = %kind, error = %e, "observer callback failed");
                }
                Err(_) => {
                    warn!(observer = id.0, event = %kind, "observer callback panicked");
                }
            }
        }
    }
}

impl<T> Default for ObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ObserverSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl Observer<u32> for Recorder {
        fn on_tick(&mut self, payload: &u32) -> ObserverResult {
            self.log.lock().unwrap().push(format!("{}:tick:{payload}", self.name));
            Ok(())
        }

        fn on_stop(&mut self, _payload: &u32) -> ObserverResult {
            self.log.lock().unwrap().push(format!("{}:stop", self.name));
            Ok(())
        }
    }

    fn recorder(name: &'static str, log: &Log) -> Box<Recorder> {
        Box::new(Recorder {
            name,
            log: log.clone(),
        })
    }

    struct Failing;

    impl Observer<u32> for Failing {
        fn on_tick(&mut self, _payload: &u32) -> ObserverResult {
            Err("display went away".into())
        }
    }

    struct Panicking;

    impl Observer<u32> for Panicking {
        fn on_tick(&mut self, _payload: &u32) -> ObserverResult {
            panic!("badge renderer exploded");
        }
    }

    #[test]
    fn delivers_in_registration_order() {
        let log = Log::default();
        let mut set = ObserverSet::new();
        set.observe(recorder("a", &log));
        set.observe(recorder("b", &log));

        set.notify(EventKind::Tick, &7);

        assert_eq!(*log.lock().unwrap(), vec!["a:tick:7", "b:tick:7"]);
    }

    #[test]
    fn absent_callbacks_are_skipped() {
        let log = Log::default();
        let mut set = ObserverSet::new();
        set.observe(recorder("a", &log));

        set.notify(EventKind::Pause, &1);
        set.notify(EventKind::Stop, &1);

        assert_eq!(*log.lock().unwrap(), vec!["a:stop"]);
    }

    #[test]
    fn failing_observer_does_not_block_the_rest() {
        let log = Log::default();
        let mut set = ObserverSet::new();
        set.observe(Box::new(Failing));
        set.observe(Box::new(Panicking));
        set.observe(recorder("late", &log));

        set.notify(EventKind::Tick, &3);

        assert_eq!(*log.lock().unwrap(), vec!["late:tick:3"]);
    }

    #[test]
    fn unobserve_removes_only_that_observer() {
        let log = Log::default();
        let mut set = ObserverSet::new();
        let a = set.observe(recorder("a", &log));
        set.observe(recorder("b", &log));

        assert!(set.unobserve(a));
        assert!(!set.unobserve(a));
        set.notify(EventKind::Tick, &2);

        assert_eq!(set.len(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["b:tick:2"]);

        set.clear();
        assert!(set.is_empty());
    }
}
