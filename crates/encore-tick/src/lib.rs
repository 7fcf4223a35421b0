//! Per-room round timer for Encore.
//!
//! A room has exactly one [`RoundTimer`]. It holds at most one deadline at a
//! time, in one of two shapes:
//!
//! - **Countdown**: fires once per tick interval with the seconds left in
//!   the round, finishing with `remaining == 0`.
//! - **Settle**: a single pause between a round's results and the next
//!   round.
//!
//! Starting either one replaces whatever was armed before, so there is no
//! way to end up with two live timers for a room.
//!
//! # Usage
//!
//! [`RoundTimer::wait`] is meant to be one branch of the room actor's
//! `tokio::select!` loop. It pends forever while idle and only mutates the
//! timer after its sleep completes, so dropping it mid-sleep (because
//! another branch won) loses nothing.
//!
//! ```rust,no_run
//! use encore_tick::{RoundTimer, TimerConfig, TimerEvent};
//!
//! # async fn example() {
//! let mut timer = RoundTimer::new(TimerConfig::default());
//! timer.start_countdown(15);
//! loop {
//!     match timer.wait().await {
//!         TimerEvent::Tick { remaining: 0 } => break,
//!         TimerEvent::Tick { remaining } => println!("{remaining}s left"),
//!         TimerEvent::SettleElapsed => unreachable!(),
//!     }
//! }
//! # }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{trace, warn};

// ---------------------------------------------------------------------------
// TimerConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`RoundTimer`].
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Time between countdown ticks. One tick takes one second off the
    /// round's remaining time.
    pub tick_interval: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl TimerConfig {
    /// Shortest tick interval accepted.
    pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);

    /// Clamps out-of-range values.
    pub fn validated(mut self) -> Self {
        if self.tick_interval < Self::MIN_TICK_INTERVAL {
            warn!(
                interval_ms = self.tick_interval.as_millis() as u64,
                "tick_interval below minimum, clamping"
            );
            self.tick_interval = Self::MIN_TICK_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// TimerEvent
// ---------------------------------------------------------------------------

/// What the timer reports when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One countdown tick. `remaining == 0` means the round's time is up;
    /// the timer is idle afterwards.
    Tick { remaining: u32 },

    /// The settle pause has elapsed; the timer is idle afterwards.
    SettleElapsed,
}

// ---------------------------------------------------------------------------
// RoundTimer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Deadline {
    Idle,
    Counting { remaining: u32, next_tick: Instant },
    Settling { until: Instant },
}

/// A room's single round timer.
#[derive(Debug)]
pub struct RoundTimer {
    config: TimerConfig,
    deadline: Deadline,
    ticks: u64,
}

impl RoundTimer {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config: config.validated(),
            deadline: Deadline::Idle,
            ticks: 0,
        }
    }

    /// Arms a countdown of `seconds` ticks, replacing any armed deadline.
    ///
    /// A zero-length countdown fires `Tick { remaining: 0 }` on the first
    /// interval.
    pub fn start_countdown(&mut self, seconds: u32) {
        self.replace(Deadline::Counting {
            remaining: seconds.max(1),
            next_tick: Instant::now() + self.config.tick_interval,
        });
    }

    /// Arms a one-shot settle pause, replacing any armed deadline.
    pub fn start_settling(&mut self, pause: Duration) {
        self.replace(Deadline::Settling {
            until: Instant::now() + pause,
        });
    }

    /// Disarms the timer.
    pub fn cancel(&mut self) {
        self.replace(Deadline::Idle);
    }

    /// Seconds left in the running countdown, or 0 if none is running.
    pub fn remaining(&self) -> u32 {
        match self.deadline {
            Deadline::Counting { remaining, .. } => remaining,
            _ => 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.deadline, Deadline::Idle)
    }

    pub fn is_counting(&self) -> bool {
        matches!(self.deadline, Deadline::Counting { .. })
    }

    pub fn is_settling(&self) -> bool {
        matches!(self.deadline, Deadline::Settling { .. })
    }

    /// Countdown ticks fired over the timer's lifetime.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Waits for the armed deadline. Pends forever while idle.
    pub async fn wait(&mut self) -> TimerEvent {
        match self.deadline {
            Deadline::Idle => std::future::pending().await,
            Deadline::Counting {
                remaining,
                next_tick,
            } => {
                time::sleep_until(next_tick).await;
                self.ticks += 1;

                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.deadline = Deadline::Idle;
                } else {
                    let interval = self.config.tick_interval;
                    let now = Instant::now();
                    let late_by = now.saturating_duration_since(next_tick);
                    // Keep the cadence anchored to the schedule unless a
                    // whole interval was missed.
                    let next_tick = if late_by >= interval {
                        warn!(
                            late_ms = late_by.as_millis() as u64,
                            remaining, "round tick overran, rescheduling"
                        );
                        now + interval
                    } else {
                        next_tick + interval
                    };
                    self.deadline = Deadline::Counting {
                        remaining,
                        next_tick,
                    };
                }
                trace!(remaining, "round tick");
                TimerEvent::Tick { remaining }
            }
            Deadline::Settling { until } => {
                time::sleep_until(until).await;
                self.deadline = Deadline::Idle;
                TimerEvent::SettleElapsed
            }
        }
    }

    fn replace(&mut self, next: Deadline) {
        if !matches!(self.deadline, Deadline::Idle) {
            trace!(previous = ?self.deadline, "replacing armed round timer");
        }
        self.deadline = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_config_default_is_one_second() {
        assert_eq!(TimerConfig::default().tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_timer_config_validated_clamps_tiny_interval() {
        let cfg = TimerConfig {
            tick_interval: Duration::ZERO,
        }
        .validated();
        assert_eq!(cfg.tick_interval, TimerConfig::MIN_TICK_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_timer_is_idle() {
        let timer = RoundTimer::new(TimerConfig::default());
        assert!(timer.is_idle());
        assert_eq!(timer.remaining(), 0);
    }
}
