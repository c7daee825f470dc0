//! Monotonic time source
//!
//! Every timed hold in the controller (blink, unlock, lockout, cooldown idle)
//! polls a [`Clock`] instead of arming a timer, so a simulated clock makes the
//! whole state machine deterministic.

use std::time::{Duration, Instant};

/// Monotonic clock with a blocking sleep
pub trait Clock {
    /// Current monotonic time
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by [`Instant`] and [`std::thread::sleep`]
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
