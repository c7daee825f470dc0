//! Indicator controller for the grant/deny lights and the unlock actuator
//!
//! Silent mode suppresses turning the status indicators on and all blinking.
//! Turning them off, and the unlock actuator with its full hold time, are
//! never suppressed.

use std::time::{Duration, Instant};

use crate::clock::Clock;

/// Longest blocking hold (unlock, lockout, blink); longer requests are cut here
pub const MAX_HOLD: Duration = Duration::from_secs(24 * 60 * 60);

/// A physical output line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    Grant,
    Deny,
    Unlock,
}

/// Status indicators visible to the person at the door
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Indicator {
    Grant,
    Deny,
}

impl From<Indicator> for Signal {
    fn from(indicator: Indicator) -> Self {
        match indicator {
            Indicator::Grant => Signal::Grant,
            Indicator::Deny => Signal::Deny,
        }
    }
}

/// Low-level output driver (GPIO, simulator, ...)
pub trait IndicatorDriver {
    fn set(&mut self, signal: Signal, on: bool);
}

/// Timed on/off blink
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlinkPattern {
    pub total: Duration,
    pub on: Duration,
    pub off: Duration,
}

impl BlinkPattern {
    pub const fn from_millis(total: u64, on: u64, off: u64) -> Self {
        Self {
            total: Duration::from_millis(total),
            on: Duration::from_millis(on),
            off: Duration::from_millis(off),
        }
    }

    /// Acknowledges a short press before capture
    pub const CAPTURE_ACK: Self = Self::from_millis(250, 60, 60);
    /// Between biometric attempts
    pub const RETRY_PULSE: Self = Self::from_millis(200, 60, 60);
    /// After a wrong PIN
    pub const BAD_PIN: Self = Self::from_millis(1200, 120, 120);
    /// After a silent-mode toggle
    pub const SILENT_ACK: Self = Self::from_millis(400, 80, 80);
    /// Repeated throughout a lockout
    pub const LOCKOUT_PULSE: Self = Self::from_millis(500, 80, 80);
}

/// Pause after each retry pulse
pub const RETRY_PAUSE: Duration = Duration::from_millis(200);

/// Pause between lockout pulses
pub const LOCKOUT_PAUSE: Duration = Duration::from_millis(200);

/// Drives indicators through an [`IndicatorDriver`], honouring silent mode
pub struct IndicatorController<D, C> {
    driver: D,
    clock: C,
    silent: bool,
}

impl<D: IndicatorDriver, C: Clock> IndicatorController<D, C> {
    pub fn new(driver: D, clock: C) -> Self {
        Self {
            driver,
            clock,
            silent: false,
        }
    }

    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Steady on or off; "on" is dropped in silent mode
    pub fn set_steady(&mut self, indicator: Indicator, on: bool) {
        if on && self.silent {
            return;
        }
        self.driver.set(indicator.into(), on);
    }

    /// Blink until `pattern.total` has elapsed; no-op in silent mode
    pub fn blink(&mut self, indicator: Indicator, pattern: BlinkPattern) {
        if self.silent {
            return;
        }
        let signal = Signal::from(indicator);
        let end = self.deadline(pattern.total);
        while self.clock.now() < end {
            self.driver.set(signal, true);
            self.clock.sleep(pattern.on);
            self.driver.set(signal, false);
            self.clock.sleep(pattern.off);
        }
    }

    /// Both status indicators off
    pub fn idle(&mut self) {
        self.driver.set(Signal::Grant, false);
        self.driver.set(Signal::Deny, false);
    }

    pub fn pause(&self, duration: Duration) {
        self.clock.sleep(duration);
    }

    /// Blocking unlock: grant on, deny off, actuator held for `duration`
    pub fn unlock(&mut self, duration: Duration) {
        self.set_steady(Indicator::Deny, false);
        self.set_steady(Indicator::Grant, true);
        self.driver.set(Signal::Unlock, true);
        self.clock.sleep(duration.min(MAX_HOLD));
        self.driver.set(Signal::Unlock, false);
        self.idle();
    }

    /// Blocking lockout hold with periodic deny pulses
    pub fn lockout(&mut self, duration: Duration) {
        let end = self.deadline(duration);
        while self.clock.now() < end {
            self.blink(Indicator::Deny, BlinkPattern::LOCKOUT_PULSE);
            self.clock.sleep(LOCKOUT_PAUSE);
        }
        self.set_steady(Indicator::Deny, false);
    }

    fn deadline(&self, duration: Duration) -> Instant {
        let now = self.clock.now();
        now.checked_add(duration.min(MAX_HOLD)).unwrap_or(now)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
