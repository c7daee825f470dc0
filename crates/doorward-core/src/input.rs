//! Operator input: the momentary button and the credential entry line

use std::time::{Duration, Instant};

use thiserror::Error;

/// Hold time at or above which a press counts as long
pub const LONG_PRESS_THRESHOLD: Duration = Duration::from_millis(1200);

/// The operator aborted input; the controller shuts down
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Error)]
#[error("operator cancelled input")]
pub struct Cancelled;

/// Short press starts an attempt, long press toggles silent mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressKind {
    Short,
    Long,
}

/// Whether the hold between `pressed` and `released` is a long press
pub fn is_long_press(pressed: Instant, released: Instant) -> bool {
    released.saturating_duration_since(pressed) >= LONG_PRESS_THRESHOLD
}

/// Blocking input capability injected into the orchestrator
pub trait InputDevice {
    /// Block until the button goes down; returns the press time
    fn wait_for_press(&mut self) -> Result<Instant, Cancelled>;

    /// Block until the button comes back up; returns the release time
    fn wait_for_release(&mut self) -> Result<Instant, Cancelled>;

    /// Block for one line of credential input
    fn solicit_credential(&mut self) -> Result<String, Cancelled>;

    /// Wait for a full press/release and classify it
    fn next_press(&mut self) -> Result<PressKind, Cancelled> {
        let pressed = self.wait_for_press()?;
        let released = self.wait_for_release()?;
        if is_long_press(pressed, released) {
            Ok(PressKind::Long)
        } else {
            Ok(PressKind::Short)
        }
    }
}
