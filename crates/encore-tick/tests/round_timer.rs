//! Integration tests for the round timer.
//!
//! All tests run on tokio's paused clock: sleeps resolve as soon as the
//! runtime is otherwise idle, and `Instant::now()` moves only when they do.

use std::time::Duration;

use encore_tick::{RoundTimer, TimerConfig, TimerEvent};
use tokio::time::Instant;

fn timer() -> RoundTimer {
    RoundTimer::new(TimerConfig::default())
}

// =========================================================================
// Countdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_once_per_second_down_to_zero() {
    let mut timer = timer();
    let start = Instant::now();
    timer.start_countdown(3);
    assert_eq!(timer.remaining(), 3);

    assert_eq!(timer.wait().await, TimerEvent::Tick { remaining: 2 });
    assert_eq!(start.elapsed(), Duration::from_secs(1));
    assert_eq!(timer.remaining(), 2);

    assert_eq!(timer.wait().await, TimerEvent::Tick { remaining: 1 });
    assert_eq!(timer.wait().await, TimerEvent::Tick { remaining: 0 });
    assert_eq!(start.elapsed(), Duration::from_secs(3));

    assert!(timer.is_idle());
    assert_eq!(timer.tick_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_zero_seconds_expires_on_first_tick() {
    let mut timer = timer();
    timer.start_countdown(0);
    assert_eq!(timer.wait().await, TimerEvent::Tick { remaining: 0 });
    assert!(timer.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_idle_timer_never_fires() {
    let mut timer = timer();
    let result = tokio::time::timeout(Duration::from_secs(60), timer.wait()).await;
    assert!(result.is_err(), "idle timer should pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_expired_countdown_goes_quiet() {
    let mut timer = timer();
    timer.start_countdown(1);
    assert_eq!(timer.wait().await, TimerEvent::Tick { remaining: 0 });

    let result = tokio::time::timeout(Duration::from_secs(10), timer.wait()).await;
    assert!(result.is_err());
}

// =========================================================================
// Replacement and cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_countdown_replaces_running_countdown() {
    let mut timer = timer();
    timer.start_countdown(15);
    timer.wait().await;
    timer.wait().await;
    assert_eq!(timer.remaining(), 13);

    timer.start_countdown(15);
    assert_eq!(timer.remaining(), 15);
    assert_eq!(timer.wait().await, TimerEvent::Tick { remaining: 14 });
}

#[tokio::test(start_paused = true)]
async fn test_settling_replaces_countdown() {
    let mut timer = timer();
    timer.start_countdown(15);
    timer.start_settling(Duration::from_secs(5));

    assert!(timer.is_settling());
    assert_eq!(timer.remaining(), 0);

    let start = Instant::now();
    assert_eq!(timer.wait().await, TimerEvent::SettleElapsed);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert!(timer.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_disarms_countdown() {
    let mut timer = timer();
    timer.start_countdown(5);
    timer.cancel();

    assert!(timer.is_idle());
    let result = tokio::time::timeout(Duration::from_secs(10), timer.wait()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_keeps_deadline() {
    let mut timer = timer();
    timer.start_countdown(5);

    // Lose the race against a shorter sleep, as a select! branch would.
    tokio::select! {
        _ = timer.wait() => panic!("timer should not win"),
        _ = tokio::time::sleep(Duration::from_millis(500)) => {}
    }
    assert_eq!(timer.remaining(), 5);

    // The original schedule still holds: first tick at t = 1s.
    assert_eq!(timer.wait().await, TimerEvent::Tick { remaining: 4 });
}

// =========================================================================
// Cadence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_slow_consumer_reschedules_after_missed_interval() {
    let mut timer = timer();
    timer.start_countdown(10);
    timer.wait().await;

    // The actor was busy for three seconds.
    tokio::time::advance(Duration::from_secs(3)).await;
    let before = Instant::now();
    assert_eq!(timer.wait().await, TimerEvent::Tick { remaining: 8 });
    assert_eq!(before.elapsed(), Duration::ZERO);

    // Next tick is a full interval after the late one.
    let after_late = Instant::now();
    timer.wait().await;
    assert_eq!(after_late.elapsed(), Duration::from_secs(1));
}
