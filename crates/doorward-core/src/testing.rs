//! Deterministic device simulators
//!
//! A [`ManualClock`] never blocks: `sleep` just moves virtual time forward,
//! so full controller cycles (5 s unlocks, 15 s lockouts) run instantly.
//! The scripted devices share that clock so press hold times are measured
//! on the same timeline.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::indicator::{IndicatorDriver, Signal};
use crate::input::{Cancelled, InputDevice, LONG_PRESS_THRESHOLD};
use crate::matcher::{BiometricMatcher, Detection, MatcherError};

/// Virtual monotonic clock; clones share the same timeline
#[derive(Clone, Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }

    /// Virtual time since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// One scripted operator action
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptedEvent {
    /// Button held for `hold`
    Press { hold: Duration },
    /// A credential line
    Credential(String),
    /// Operator interrupt
    Cancel,
}

/// Input device replaying a fixed script; an exhausted script cancels
#[derive(Debug)]
pub struct ScriptedInput<C> {
    clock: C,
    events: VecDeque<ScriptedEvent>,
    pending_hold: Option<Duration>,
}

impl<C: Clock> ScriptedInput<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            events: VecDeque::new(),
            pending_hold: None,
        }
    }

    pub fn push(mut self, event: ScriptedEvent) -> Self {
        self.events.push_back(event);
        self
    }

    pub fn short_press(self) -> Self {
        self.push(ScriptedEvent::Press {
            hold: Duration::from_millis(100),
        })
    }

    pub fn long_press(self) -> Self {
        self.push(ScriptedEvent::Press {
            hold: LONG_PRESS_THRESHOLD + Duration::from_millis(300),
        })
    }

    pub fn credential(self, pin: &str) -> Self {
        self.push(ScriptedEvent::Credential(pin.to_string()))
    }

    pub fn cancel(self) -> Self {
        self.push(ScriptedEvent::Cancel)
    }

    /// Events not yet consumed
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl<C: Clock> InputDevice for ScriptedInput<C> {
    fn wait_for_press(&mut self) -> Result<Instant, Cancelled> {
        match self.events.front() {
            Some(ScriptedEvent::Press { hold }) => {
                self.pending_hold = Some(*hold);
                self.events.pop_front();
                Ok(self.clock.now())
            }
            Some(ScriptedEvent::Cancel) => {
                self.events.pop_front();
                Err(Cancelled)
            }
            _ => Err(Cancelled),
        }
    }

    fn wait_for_release(&mut self) -> Result<Instant, Cancelled> {
        let hold = self.pending_hold.take().ok_or(Cancelled)?;
        self.clock.sleep(hold);
        Ok(self.clock.now())
    }

    fn solicit_credential(&mut self) -> Result<String, Cancelled> {
        match self.events.front() {
            Some(ScriptedEvent::Credential(pin)) => {
                let pin = pin.clone();
                self.events.pop_front();
                Ok(pin)
            }
            Some(ScriptedEvent::Cancel) => {
                self.events.pop_front();
                Err(Cancelled)
            }
            _ => Err(Cancelled),
        }
    }
}

/// Matcher replaying scripted frames; reports no subject once exhausted
#[derive(Debug, Default)]
pub struct ScriptedMatcher {
    frames: VecDeque<Result<Vec<Detection>, MatcherError>>,
    calls: usize,
}

impl ScriptedMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(mut self, detections: Vec<Detection>) -> Self {
        self.frames.push_back(Ok(detections));
        self
    }

    pub fn empty_frame(self) -> Self {
        self.frame(Vec::new())
    }

    pub fn failure(mut self, error: MatcherError) -> Self {
        self.frames.push_back(Err(error));
        self
    }

    /// Number of frames captured so far
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl BiometricMatcher for ScriptedMatcher {
    fn detect_and_match(&mut self) -> Result<Vec<Detection>, MatcherError> {
        self.calls += 1;
        self.frames.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// One recorded output change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub at: Instant,
    pub signal: Signal,
    pub on: bool,
}

/// Indicator driver that records every transition with its virtual time
#[derive(Debug)]
pub struct RecordingIndicators<C> {
    clock: C,
    transitions: Vec<Transition>,
}

impl<C: Clock> RecordingIndicators<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            transitions: Vec::new(),
        }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// How many times `signal` was driven to `on`
    pub fn count(&self, signal: Signal, on: bool) -> usize {
        self.transitions
            .iter()
            .filter(|t| t.signal == signal && t.on == on)
            .count()
    }

    pub fn last_state(&self, signal: Signal) -> Option<bool> {
        self.transitions
            .iter()
            .rev()
            .find(|t| t.signal == signal)
            .map(|t| t.on)
    }

    /// Time between the first on and the following off of `signal`
    pub fn held_duration(&self, signal: Signal) -> Option<Duration> {
        let mut relevant = self.transitions.iter().filter(|t| t.signal == signal);
        let start = relevant.find(|t| t.on)?;
        let end = relevant.find(|t| !t.on)?;
        Some(end.at - start.at)
    }
}

impl<C: Clock> IndicatorDriver for RecordingIndicators<C> {
    fn set(&mut self, signal: Signal, on: bool) {
        self.transitions.push(Transition {
            at: self.clock.now(),
            signal,
            on,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PressKind;

    #[test]
    fn test_manual_clock_shared_timeline() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();

        other.sleep(Duration::from_secs(3));

        assert_eq!(clock.now() - start, Duration::from_secs(3));
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn test_scripted_input_classifies_presses() {
        let clock = ManualClock::new();
        let mut input = ScriptedInput::new(clock).short_press().long_press();

        assert_eq!(input.next_press(), Ok(PressKind::Short));
        assert_eq!(input.next_press(), Ok(PressKind::Long));
        assert_eq!(input.next_press(), Err(Cancelled));
    }

    #[test]
    fn test_scripted_input_out_of_order_cancels() {
        let mut input = ScriptedInput::new(ManualClock::new()).credential("1234");

        assert_eq!(input.wait_for_press(), Err(Cancelled));
        assert_eq!(input.remaining(), 1);
        assert_eq!(input.solicit_credential(), Ok("1234".to_string()));
    }

    #[test]
    fn test_scripted_matcher_defaults_to_no_subject() {
        let mut matcher = ScriptedMatcher::new().frame(vec![Detection::single("alice", 0.2)]);

        assert_eq!(matcher.detect_and_match().unwrap().len(), 1);
        assert!(matcher.detect_and_match().unwrap().is_empty());
        assert_eq!(matcher.calls(), 2);
    }
}
