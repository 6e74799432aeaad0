//! Integration tests for the countdown timer.
//!
//! Timing properties are checked against a manual clock so every run is
//! deterministic regardless of how the polls are spaced.

use std::sync::Arc;
use std::time::Duration;

use pomocycle_core::{CountdownTimer, ManualClock, TimerEvent, TimerState};
use proptest::prelude::*;

fn countdown(duration_ms: u64, tick_ms: u64) -> (CountdownTimer, ManualClock) {
    let clock = ManualClock::new();
    let timer = CountdownTimer::with_clock(
        Duration::from_millis(duration_ms),
        Duration::from_millis(tick_ms),
        Arc::new(clock.clone()),
    );
    (timer, clock)
}

proptest! {
    #[test]
    fn full_run_emits_floor_ticks_then_one_expire(
        duration_ms in 0u64..=60_000,
        tick_ms in 50u64..=5_000,
        poll_ms in 1u64..=3_000,
    ) {
        let (mut timer, clock) = countdown(duration_ms, tick_ms);
        timer.start().unwrap();

        let mut events = Vec::new();
        for _ in 0..=(duration_ms / poll_ms + 1) {
            events.extend(timer.tick());
            clock.advance_millis(poll_ms);
        }
        events.extend(timer.tick());
        // Once expired, nothing more arrives.
        clock.advance_millis(10 * tick_ms);
        events.extend(timer.tick());

        let ticks = events.iter().filter(|e| matches!(e, TimerEvent::Ticked(_))).count() as u64;
        let expires = events.iter().filter(|e| e.is_expired()).count();
        prop_assert_eq!(ticks, duration_ms / tick_ms);
        prop_assert_eq!(expires, 1);
        prop_assert!(events.last().unwrap().is_expired());
        prop_assert_eq!(timer.state(), TimerState::Expired);
    }

    #[test]
    fn paused_wall_time_never_counts(
        duration_ms in 1_000u64..=600_000,
        pause_at_permille in 0u64..1_000,
        waited_ms in 0u64..=86_400_000,
        cycles in 1usize..5,
    ) {
        let (mut timer, clock) = countdown(duration_ms, 1_000);
        timer.start().unwrap();
        let pause_at = duration_ms * pause_at_permille / 1_000;
        clock.advance_millis(pause_at);

        for _ in 0..cycles {
            timer.pause().unwrap();
            let frozen = timer.remaining();
            clock.advance_millis(waited_ms);
            timer.resume().unwrap();
            prop_assert_eq!(timer.remaining(), frozen);
        }

        prop_assert_eq!(timer.elapsed(), Duration::from_millis(pause_at));
        prop_assert_eq!(timer.remaining(), Duration::from_millis(duration_ms - pause_at));
    }

    #[test]
    fn rejected_resume_changes_nothing(elapsed_ms in 0u64..10_000, stop_first in any::<bool>()) {
        let (mut timer, clock) = countdown(10_000, 1_000);
        timer.start().unwrap();
        clock.advance_millis(elapsed_ms);
        if stop_first {
            timer.stop().unwrap();
        }
        let state = timer.state();
        let elapsed = timer.elapsed();

        prop_assert!(timer.resume().is_err());
        prop_assert_eq!(timer.state(), state);
        prop_assert_eq!(timer.elapsed(), elapsed);
    }
}

#[test]
fn expiration_instant_survives_many_pauses() {
    let (mut timer, clock) = countdown(10_000, 1_000);
    timer.start().unwrap();

    // Ten 1s running segments separated by pauses of varying length.
    for i in 0..9 {
        clock.advance_secs(1);
        assert!(timer.tick().iter().all(|e| !e.is_expired()));
        timer.pause().unwrap();
        clock.advance_millis(137 * (i + 1));
        timer.resume().unwrap();
    }
    clock.advance_millis(999);
    assert!(timer.tick().iter().all(|e| !e.is_expired()));
    clock.advance_millis(1);
    assert!(timer.tick().last().unwrap().is_expired());
}

#[test]
fn tick_payload_reports_rounded_remaining_seconds() {
    let (mut timer, clock) = countdown(5_000, 1_000);
    timer.start().unwrap();
    clock.advance_millis(1_200);
    let events = timer.tick();
    assert_eq!(events.len(), 1);
    let snap = events[0].snapshot();
    assert_eq!(snap.ticks, 1);
    assert_eq!(snap.remaining_secs(), 4);
}
