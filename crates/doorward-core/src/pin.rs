//! PIN challenge engine
//!
//! Solicits credentials until one grants or the bad-PIN counter reaches the
//! configured maximum. The counter lives in [`SessionState`], so bad PINs
//! from earlier cycles still count until a grant or a lockout resets it.

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::clock::Clock;
use crate::credentials::{CredentialStore, PinClass};
use crate::event_log::{Detail, EventKind, EventRecorder, EventSink, LogRecord};
use crate::indicator::{BlinkPattern, Indicator, IndicatorController, IndicatorDriver};
use crate::input::{Cancelled, InputDevice};
use crate::session::SessionState;

/// How a PIN challenge ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeOutcome {
    GrantedPin,
    GrantedEmergency,
    LockedOut,
}

impl ChallengeOutcome {
    pub fn is_granted(&self) -> bool {
        !matches!(self, ChallengeOutcome::LockedOut)
    }
}

pub struct PinChallenge<'a> {
    store: &'a CredentialStore,
}

impl<'a> PinChallenge<'a> {
    pub fn new(store: &'a CredentialStore) -> Self {
        Self { store }
    }

    /// Run one challenge sub-session
    ///
    /// Cancellation while soliciting a credential aborts the challenge and
    /// is passed straight back to the caller.
    pub fn run<I, D, C, L>(
        &self,
        state: &mut SessionState,
        input: &mut I,
        indicators: &mut IndicatorController<D, C>,
        recorder: &mut EventRecorder<L>,
    ) -> Result<ChallengeOutcome, Cancelled>
    where
        I: InputDevice,
        D: IndicatorDriver,
        C: Clock,
        L: EventSink,
    {
        let policy = self.store.policy();
        loop {
            let entered = Zeroizing::new(input.solicit_credential()?);

            match self.store.classify(entered.trim()) {
                PinClass::Emergency => {
                    info!("EMERGENCY PIN  Unlock");
                    recorder.event(EventKind::EmergencyPin);
                    state.reset_bad_pins();
                    return Ok(ChallengeOutcome::GrantedEmergency);
                }
                PinClass::Primary => {
                    info!("PIN OK  Unlock");
                    recorder.event(EventKind::GrantedPin);
                    state.reset_bad_pins();
                    return Ok(ChallengeOutcome::GrantedPin);
                }
                PinClass::Invalid => {
                    let tries = state.record_bad_pin();
                    warn!("PIN BAD  tries={}/{}", tries, policy.max_pin_tries);
                    recorder.record(
                        LogRecord::now(EventKind::BadPin).with_detail(Detail::Tries(tries)),
                    );
                    indicators.blink(Indicator::Deny, BlinkPattern::BAD_PIN);
                    indicators.set_steady(Indicator::Deny, true);

                    if tries >= policy.max_pin_tries {
                        indicators.set_steady(Indicator::Deny, false);
                        warn!("LOCKOUT {}s", policy.lockout_duration.as_secs());
                        recorder.event(EventKind::Lockout);
                        indicators.lockout(policy.lockout_duration);
                        state.reset_bad_pins();
                        return Ok(ChallengeOutcome::LockedOut);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{AccessPolicy, PinSecret};
    use crate::event_log::MemoryEventLog;
    use crate::indicator::Signal;
    use crate::roster::Roster;
    use crate::testing::{ManualClock, RecordingIndicators, ScriptedInput};
    use std::time::Duration;

    struct Fixture {
        store: CredentialStore,
        state: SessionState,
        clock: ManualClock,
        indicators: IndicatorController<RecordingIndicators<ManualClock>, ManualClock>,
        recorder: EventRecorder<MemoryEventLog>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = CredentialStore::new(
                Roster::new(["alice"], Vec::<String>::new()),
                PinSecret::parse("1234").unwrap(),
                PinSecret::parse("0000").unwrap(),
                AccessPolicy::default(),
            )
            .unwrap();
            let clock = ManualClock::new();
            Self {
                store,
                state: SessionState::new(),
                indicators: IndicatorController::new(
                    RecordingIndicators::new(clock.clone()),
                    clock.clone(),
                ),
                clock,
                recorder: EventRecorder::new(MemoryEventLog::new()),
            }
        }

        fn run(
            &mut self,
            input: &mut ScriptedInput<ManualClock>,
        ) -> Result<ChallengeOutcome, Cancelled> {
            PinChallenge::new(&self.store).run(
                &mut self.state,
                input,
                &mut self.indicators,
                &mut self.recorder,
            )
        }

        fn input(&self) -> ScriptedInput<ManualClock> {
            ScriptedInput::new(self.clock.clone())
        }
    }

    #[test]
    fn test_primary_pin_grants() {
        let mut fx = Fixture::new();
        let mut input = fx.input().credential("1234");

        assert_eq!(fx.run(&mut input), Ok(ChallengeOutcome::GrantedPin));
        assert_eq!(fx.recorder.sink().kinds(), vec![EventKind::GrantedPin]);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let mut fx = Fixture::new();
        let mut input = fx.input().credential("  1234\n");

        assert_eq!(fx.run(&mut input), Ok(ChallengeOutcome::GrantedPin));
    }

    #[test]
    fn test_three_bad_pins_lock_out() {
        let mut fx = Fixture::new();
        let mut input = fx.input().credential("1111").credential("2222").credential("3333");
        let start = fx.clock.now();

        assert_eq!(fx.run(&mut input), Ok(ChallengeOutcome::LockedOut));
        assert_eq!(fx.state.consecutive_bad_pins(), 0);
        assert_eq!(input.remaining(), 0);
        assert_eq!(
            fx.recorder.sink().kinds(),
            vec![
                EventKind::BadPin,
                EventKind::BadPin,
                EventKind::BadPin,
                EventKind::Lockout
            ]
        );
        let tries: Vec<_> = fx.recorder.sink().records()[..3]
            .iter()
            .map(|r| r.detail)
            .collect();
        assert_eq!(
            tries,
            vec![Some(Detail::Tries(1)), Some(Detail::Tries(2)), Some(Detail::Tries(3))]
        );
        assert!(fx.clock.now() - start >= Duration::from_secs(15));
    }

    #[test]
    fn test_emergency_grants_after_bad_pins_and_resets() {
        let mut fx = Fixture::new();
        let mut input = fx.input().credential("9999").credential("8888").credential("0000");

        assert_eq!(fx.run(&mut input), Ok(ChallengeOutcome::GrantedEmergency));
        assert_eq!(fx.state.consecutive_bad_pins(), 0);
        assert_eq!(fx.recorder.sink().count(EventKind::EmergencyPin), 1);
    }

    #[test]
    fn test_counter_carries_across_challenges() {
        let mut fx = Fixture::new();
        fx.state.record_bad_pin();
        fx.state.record_bad_pin();
        let mut input = fx.input().credential("5555");

        assert_eq!(fx.run(&mut input), Ok(ChallengeOutcome::LockedOut));
        assert_eq!(fx.recorder.sink().count(EventKind::BadPin), 1);
    }

    #[test]
    fn test_cancellation_propagates() {
        let mut fx = Fixture::new();
        let mut input = fx.input().credential("1111").cancel();

        assert_eq!(fx.run(&mut input), Err(Cancelled));
        assert_eq!(fx.state.consecutive_bad_pins(), 1);
    }

    #[test]
    fn test_bad_pin_leaves_deny_steady() {
        let mut fx = Fixture::new();
        let mut input = fx.input().credential("1111").credential("1234");

        fx.run(&mut input).unwrap();

        let driver = fx.indicators.driver();
        // 1.2s at 120/120 → 5 flashes, then steady on
        assert_eq!(driver.count(Signal::Deny, true), 6);
        assert_eq!(driver.last_state(Signal::Deny), Some(true));
    }
}
