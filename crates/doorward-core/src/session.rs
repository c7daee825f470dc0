//! Cross-cycle session state owned by the orchestrator

use std::time::{Duration, Instant};

/// State that survives from one attempt cycle to the next
///
/// Nothing here is persisted; a restart begins with no cooldown, a zero
/// bad-PIN counter and silent mode off.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Start of the previous cycle; `None` is infinitely far in the past
    last_attempt: Option<Instant>,
    consecutive_bad_pins: u32,
    silent_mode: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    /// Stamp the start of a cycle
    pub fn mark_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// Time left before the next cycle may start
    pub fn cooldown_remaining(&self, now: Instant, cooldown: Duration) -> Duration {
        match self.last_attempt {
            Some(last) => cooldown.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn in_cooldown(&self, now: Instant, cooldown: Duration) -> bool {
        !self.cooldown_remaining(now, cooldown).is_zero()
    }

    pub fn consecutive_bad_pins(&self) -> u32 {
        self.consecutive_bad_pins
    }

    /// Count one more bad PIN and return the new total
    pub fn record_bad_pin(&mut self) -> u32 {
        self.consecutive_bad_pins = self.consecutive_bad_pins.saturating_add(1);
        self.consecutive_bad_pins
    }

    pub fn reset_bad_pins(&mut self) {
        self.consecutive_bad_pins = 0;
    }

    pub fn silent_mode(&self) -> bool {
        self.silent_mode
    }

    /// Flip silent mode and return the new value
    pub fn toggle_silent(&mut self) -> bool {
        self.silent_mode = !self.silent_mode;
        self.silent_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_cooldown_initially() {
        let state = SessionState::new();
        assert!(!state.in_cooldown(Instant::now(), Duration::from_secs(3)));
    }

    #[test]
    fn test_cooldown_measured_from_cycle_start() {
        let mut state = SessionState::new();
        let start = Instant::now();
        state.mark_attempt(start);
        let cooldown = Duration::from_secs(3);

        assert!(state.in_cooldown(start, cooldown));
        assert!(state.in_cooldown(start + Duration::from_millis(2999), cooldown));
        assert!(!state.in_cooldown(start + Duration::from_secs(3), cooldown));
        assert_eq!(
            state.cooldown_remaining(start + Duration::from_secs(1), cooldown),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_bad_pin_counter() {
        let mut state = SessionState::new();
        assert_eq!(state.record_bad_pin(), 1);
        assert_eq!(state.record_bad_pin(), 2);
        state.reset_bad_pins();
        assert_eq!(state.consecutive_bad_pins(), 0);
    }

    #[test]
    fn test_silent_toggle_round_trip() {
        let mut state = SessionState::new();
        assert!(state.toggle_silent());
        assert!(!state.toggle_silent());
        assert!(state.toggle_silent());
    }
}
