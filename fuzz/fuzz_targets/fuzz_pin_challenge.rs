#![no_main]

use arbitrary::Arbitrary;
use doorward_core::{
    testing::{ManualClock, RecordingIndicators, ScriptedInput},
    AccessPolicy, ChallengeOutcome, CredentialStore, EventKind, EventRecorder,
    IndicatorController, MemoryEventLog, PinChallenge, PinSecret, Roster, SessionState,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    max_pin_tries: u8,
    entries: Vec<String>,
}

fuzz_target!(|input: Input| {
    let max_pin_tries = u32::from(input.max_pin_tries % 8) + 1;
    let policy = AccessPolicy {
        max_pin_tries,
        ..Default::default()
    };
    let store = CredentialStore::new(
        Roster::new(["alice"], Vec::<String>::new()),
        PinSecret::parse("1234").unwrap(),
        PinSecret::parse("0000").unwrap(),
        policy,
    )
    .unwrap();

    let clock = ManualClock::new();
    let mut script = ScriptedInput::new(clock.clone());
    for entry in input.entries.iter().take(64) {
        script = script.credential(entry);
    }
    let mut indicators = IndicatorController::new(RecordingIndicators::new(clock.clone()), clock);
    let mut recorder = EventRecorder::new(MemoryEventLog::new());
    let mut state = SessionState::new();

    // Counter never reaches the limit outside a challenge, and every
    // finished challenge leaves it clear
    while let Ok(outcome) =
        PinChallenge::new(&store).run(&mut state, &mut script, &mut indicators, &mut recorder)
    {
        assert_eq!(state.consecutive_bad_pins(), 0);
        if outcome == ChallengeOutcome::LockedOut {
            assert_eq!(
                recorder.sink().records().last().map(|r| r.event),
                Some(EventKind::Lockout)
            );
        }
    }
    assert!(state.consecutive_bad_pins() < max_pin_tries);
});
