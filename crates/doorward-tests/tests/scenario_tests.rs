//! End-to-end scenarios for the Doorward controller
//!
//! Each test wires a full orchestrator from a controller configuration,
//! drives it with scripted devices on a virtual clock and checks both the
//! cycle outcomes and what reached the event log.

use std::time::Duration;

use doorward_controller::{ControllerConfig, ReplayMatcher};
use doorward_core::{
    testing::{ManualClock, RecordingIndicators, ScriptedInput, ScriptedMatcher},
    AttemptOutcome, BiometricMatcher, ChallengeOutcome, CsvEventLog, CycleOutcome, Detail,
    Detection, EncodingMatcher, EventKind, EventSink, FaceSource, Gallery, GrantBasis,
    InputDevice, MatcherError, MemoryEventLog, Orchestrator, Score, SessionExit, Signal,
};
use tempfile::tempdir;

type Controller<M, L> =
    Orchestrator<M, ScriptedInput<ManualClock>, RecordingIndicators<ManualClock>, ManualClock, L>;

fn config() -> ControllerConfig {
    ControllerConfig {
        authorized: vec!["alice".into()],
        admin: vec!["root".into()],
        ..Default::default()
    }
}

fn controller<M, L>(
    config: &ControllerConfig,
    matcher: M,
    script: impl FnOnce(ScriptedInput<ManualClock>) -> ScriptedInput<ManualClock>,
    sink: L,
) -> (Controller<M, L>, ManualClock)
where
    M: BiometricMatcher,
    L: EventSink,
{
    let clock = ManualClock::new();
    let input = script(ScriptedInput::new(clock.clone()));
    let orch = Orchestrator::new(
        config.credential_store().unwrap(),
        matcher,
        input,
        RecordingIndicators::new(clock.clone()),
        clock.clone(),
        sink,
    );
    (orch, clock)
}

/// Step past any cooldown polling to the next real cycle
fn next_cycle<M, I, L>(
    orch: &mut Orchestrator<M, I, RecordingIndicators<ManualClock>, ManualClock, L>,
) -> CycleOutcome
where
    M: BiometricMatcher,
    I: InputDevice,
    L: EventSink,
{
    loop {
        match orch.step() {
            Ok(CycleOutcome::CoolingDown) => continue,
            Ok(outcome) => return outcome,
            Err(cancelled) => panic!("session ended early: {}", cancelled),
        }
    }
}

// ==========================================
// Biometric path
// ==========================================

#[test]
fn test_authorized_face_is_granted_and_unlocks() {
    let matcher = ScriptedMatcher::new().frame(vec![Detection::single("alice", 0.3)]);
    let (mut orch, _) = controller(&config(), matcher, |i| i.short_press(), MemoryEventLog::new());

    let outcome = next_cycle(&mut orch);

    assert_eq!(
        outcome,
        CycleOutcome::GrantedFace(AttemptOutcome::Granted {
            identity: "alice".into(),
            confidence: 0.3,
            basis: GrantBasis::Authorized,
        })
    );
    assert_eq!(
        orch.indicators().driver().held_duration(Signal::Unlock),
        Some(Duration::from_secs(5))
    );
    let record = &orch.event_log().records()[0];
    assert_eq!(record.event, EventKind::GrantedFace);
    assert_eq!(record.subject.as_deref(), Some("alice"));
    assert_eq!(record.detail, Some(Detail::Distance(0.3)));
}

#[test]
fn test_admin_face_is_granted() {
    let matcher = ScriptedMatcher::new().frame(vec![Detection::single("root", 0.1)]);
    let (mut orch, _) = controller(&config(), matcher, |i| i.short_press(), MemoryEventLog::new());

    match next_cycle(&mut orch) {
        CycleOutcome::GrantedFace(AttemptOutcome::Granted { basis, .. }) => {
            assert_eq!(basis, GrantBasis::Admin)
        }
        other => panic!("expected admin grant, got {:?}", other),
    }
}

#[test]
fn test_first_acceptable_subject_wins_in_either_order() {
    let authorized = Detection::single("alice", 0.45);
    let unauthorized = Detection::single("mallory", 0.1);

    for frame in [
        vec![authorized.clone(), unauthorized.clone()],
        vec![unauthorized.clone(), authorized.clone()],
    ] {
        let matcher = ScriptedMatcher::new().frame(frame);
        let (mut orch, _) =
            controller(&config(), matcher, |i| i.short_press(), MemoryEventLog::new());

        let outcome = next_cycle(&mut orch);
        assert!(outcome.is_granted(), "{:?}", outcome);
        assert_eq!(orch.matcher().calls(), 1);
    }
}

#[test]
fn test_no_subject_exhausts_retries_before_pin() {
    let (mut orch, _) = controller(
        &config(),
        ScriptedMatcher::new(),
        |i| i.short_press().credential("1234"),
        MemoryEventLog::new(),
    );

    let outcome = next_cycle(&mut orch);

    assert_eq!(
        outcome,
        CycleOutcome::PinChallenge {
            biometric: AttemptOutcome::DeniedNoSubject,
            challenge: ChallengeOutcome::GrantedPin,
        }
    );
    assert_eq!(orch.matcher().calls(), 3);
    assert_eq!(
        orch.event_log().kinds(),
        vec![EventKind::DeniedNoFace, EventKind::GrantedPin]
    );
}

#[test]
fn test_zero_retries_attempts_once() {
    let config = ControllerConfig {
        biometric_retries: 0,
        ..config()
    };
    let (mut orch, _) = controller(
        &config,
        ScriptedMatcher::new(),
        |i| i.short_press().credential("1234"),
        MemoryEventLog::new(),
    );

    next_cycle(&mut orch);

    assert_eq!(orch.matcher().calls(), 1);
}

#[test]
fn test_known_but_unauthorized_is_denied_with_best_guess() {
    let matcher = ScriptedMatcher::new().frame(vec![Detection::new(vec![
        Score::new("mallory", 0.2),
        Score::new("alice", 0.6),
    ])]);
    let config = ControllerConfig {
        biometric_retries: 0,
        ..config()
    };
    let (mut orch, _) = controller(
        &config,
        matcher,
        |i| i.short_press().credential("1234"),
        MemoryEventLog::new(),
    );

    match next_cycle(&mut orch) {
        CycleOutcome::PinChallenge { biometric, .. } => assert_eq!(
            biometric,
            AttemptOutcome::DeniedKnownButUnauthorized {
                identity: "mallory".into(),
                confidence: 0.2,
            }
        ),
        other => panic!("expected PIN fallback, got {:?}", other),
    }
    let denial = &orch.event_log().records()[0];
    assert_eq!(denial.event, EventKind::DeniedFace);
    assert_eq!(denial.subject.as_deref(), Some("mallory"));
}

// ==========================================
// PIN path
// ==========================================

#[test]
fn test_three_bad_pins_lock_out() {
    let (mut orch, clock) = controller(
        &config(),
        ScriptedMatcher::new(),
        |i| {
            i.short_press()
                .credential("1111")
                .credential("2222")
                .credential("3333")
        },
        MemoryEventLog::new(),
    );

    let outcome = next_cycle(&mut orch);

    assert_eq!(
        outcome,
        CycleOutcome::PinChallenge {
            biometric: AttemptOutcome::DeniedNoSubject,
            challenge: ChallengeOutcome::LockedOut,
        }
    );
    assert_eq!(orch.state().consecutive_bad_pins(), 0);
    assert!(clock.elapsed() >= Duration::from_secs(15));
    assert_eq!(orch.indicators().driver().count(Signal::Unlock, true), 0);
    assert_eq!(
        orch.event_log().kinds(),
        vec![
            EventKind::DeniedNoFace,
            EventKind::BadPin,
            EventKind::BadPin,
            EventKind::BadPin,
            EventKind::Lockout,
        ]
    );
    let tries: Vec<_> = orch
        .event_log()
        .records()
        .iter()
        .filter_map(|r| match r.detail {
            Some(Detail::Tries(n)) => Some(n),
            _ => None,
        })
        .collect();
    assert_eq!(tries, vec![1, 2, 3]);
}

#[test]
fn test_controller_recovers_after_lockout() {
    let (mut orch, _) = controller(
        &config(),
        ScriptedMatcher::new(),
        |i| {
            i.short_press()
                .credential("1111")
                .credential("2222")
                .credential("3333")
                .short_press()
                .credential("1234")
        },
        MemoryEventLog::new(),
    );

    next_cycle(&mut orch);
    let outcome = next_cycle(&mut orch);

    assert!(outcome.is_granted());
    assert_eq!(orch.indicators().driver().count(Signal::Unlock, true), 1);
}

#[test]
fn test_emergency_pin_overrides_bad_attempts() {
    let (mut orch, _) = controller(
        &config(),
        ScriptedMatcher::new(),
        |i| {
            i.short_press()
                .credential("1111")
                .credential("2222")
                .credential("0000")
        },
        MemoryEventLog::new(),
    );

    let outcome = next_cycle(&mut orch);

    assert_eq!(
        outcome,
        CycleOutcome::PinChallenge {
            biometric: AttemptOutcome::DeniedNoSubject,
            challenge: ChallengeOutcome::GrantedEmergency,
        }
    );
    assert_eq!(orch.state().consecutive_bad_pins(), 0);
    assert_eq!(orch.event_log().count(EventKind::EmergencyPin), 1);
}

// ==========================================
// Operator controls
// ==========================================

#[test]
fn test_double_long_press_restores_indicators() {
    let matcher = ScriptedMatcher::new().frame(vec![Detection::single("alice", 0.2)]);
    let (mut orch, _) = controller(
        &config(),
        matcher,
        |i| i.long_press().long_press().short_press(),
        MemoryEventLog::new(),
    );

    assert_eq!(next_cycle(&mut orch), CycleOutcome::SilentToggled(true));
    assert_eq!(next_cycle(&mut orch), CycleOutcome::SilentToggled(false));
    assert!(next_cycle(&mut orch).is_granted());

    assert!(!orch.state().silent_mode());
    let toggles: Vec<_> = orch
        .event_log()
        .records()
        .iter()
        .filter(|r| r.event == EventKind::SilentToggle)
        .map(|r| r.subject.clone())
        .collect();
    assert_eq!(toggles, vec![Some("on".into()), Some("off".into())]);
}

#[test]
fn test_cycles_are_spaced_by_cooldown() {
    let (mut orch, _) = controller(
        &config(),
        ScriptedMatcher::new()
            .frame(vec![Detection::single("alice", 0.2)])
            .frame(vec![Detection::single("alice", 0.2)]),
        |i| i.short_press().short_press(),
        MemoryEventLog::new(),
    );

    next_cycle(&mut orch);
    let first = orch.state().last_attempt().unwrap();
    next_cycle(&mut orch);
    let second = orch.state().last_attempt().unwrap();

    assert!(second - first >= Duration::from_secs(3));
}

#[test]
fn test_run_exits_cleanly_on_cancel() {
    let (mut orch, _) = controller(
        &config(),
        ScriptedMatcher::new(),
        |i| i.short_press().cancel(),
        MemoryEventLog::new(),
    );

    assert_eq!(orch.run(), SessionExit::Cancelled);
    assert_eq!(
        orch.event_log().kinds(),
        vec![EventKind::Start, EventKind::DeniedNoFace]
    );
    assert_eq!(orch.indicators().driver().last_state(Signal::Deny), Some(false));
}

// ==========================================
// Event log and replay
// ==========================================

#[test]
fn test_csv_log_round_trip_for_full_session() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs").join("access_log.csv");
    let matcher = ScriptedMatcher::new()
        .frame(vec![Detection::single("alice", 0.3)])
        .frame(vec![Detection::single("bob", 0.9)])
        .frame(vec![Detection::single("bob", 0.9)])
        .frame(vec![Detection::single("bob", 0.9)]);
    let (mut orch, _) = controller(
        &config(),
        matcher,
        |i| i.short_press().short_press().credential("9999").credential("1234"),
        CsvEventLog::new(&path),
    );

    assert_eq!(orch.run(), SessionExit::Cancelled);

    let records = CsvEventLog::read_all(&path).unwrap();
    let kinds: Vec<_> = records.iter().map(|r| r.event).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Start,
            EventKind::GrantedFace,
            EventKind::DeniedFace,
            EventKind::BadPin,
            EventKind::GrantedPin,
        ]
    );
    assert_eq!(records[1].detail, Some(Detail::Distance(0.3)));
    assert_eq!(records[2].subject.as_deref(), Some("bob"));
    assert_eq!(records[3].detail, Some(Detail::Tries(1)));
    assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.starts_with("time,event,who,dist\n"));
    assert_eq!(raw.matches("time,event,who,dist").count(), 1);
}

#[test]
fn test_replayed_frames_drive_a_session() {
    let frames = r#"[
        [{ "label": "alice", "distance": 0.25 }],
        [],
        [{ "scores": [{ "label": "alice", "distance": 0.7 }, { "label": "zed", "distance": 0.8 }] }]
    ]"#;
    let config = ControllerConfig {
        biometric_retries: 1,
        ..config()
    };
    let (mut orch, _) = controller(
        &config,
        ReplayMatcher::from_json(frames).unwrap(),
        |i| i.short_press().short_press().credential("1234"),
        MemoryEventLog::new(),
    );

    assert!(matches!(
        next_cycle(&mut orch),
        CycleOutcome::GrantedFace(AttemptOutcome::Granted { .. })
    ));
    match next_cycle(&mut orch) {
        CycleOutcome::PinChallenge {
            biometric,
            challenge,
        } => {
            assert_eq!(
                biometric,
                AttemptOutcome::DeniedUnknown {
                    best_guess: "alice".into(),
                    confidence: 0.7,
                }
            );
            assert_eq!(challenge, ChallengeOutcome::GrantedPin);
        }
        other => panic!("expected PIN fallback, got {:?}", other),
    }
}

/// Camera stand-in producing fixed encodings, one capture per entry
struct FixedFaces(Vec<Vec<Vec<f64>>>);

impl FaceSource for FixedFaces {
    fn capture_encodings(&mut self) -> Result<Vec<Vec<f64>>, MatcherError> {
        if self.0.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(self.0.remove(0))
        }
    }
}

#[test]
fn test_encoding_matcher_grants_nearest_enrolled_face() {
    let gallery = Gallery::new(
        vec!["alice".into(), "bob".into()],
        vec![vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]],
    )
    .unwrap();
    let faces = FixedFaces(vec![vec![vec![0.9, 1.0, 1.0]], vec![vec![0.1, 0.0, 0.2]]]);
    let config = ControllerConfig {
        biometric_retries: 1,
        ..config()
    };
    let (mut orch, _) = controller(
        &config,
        EncodingMatcher::new(gallery, faces),
        |i| i.short_press(),
        MemoryEventLog::new(),
    );

    match next_cycle(&mut orch) {
        CycleOutcome::GrantedFace(AttemptOutcome::Granted {
            identity,
            confidence,
            ..
        }) => {
            assert_eq!(identity, "alice");
            assert!(confidence < 0.25);
        }
        other => panic!("expected grant on retry, got {:?}", other),
    }
    assert_eq!(orch.event_log().kinds(), vec![EventKind::GrantedFace]);
}

#[test]
fn test_empty_gallery_logs_unknown_without_distance() {
    let gallery = Gallery::new(Vec::new(), Vec::new()).unwrap();
    let faces = FixedFaces(vec![vec![vec![0.5, 0.5]]]);
    let config = ControllerConfig {
        biometric_retries: 0,
        ..config()
    };
    let (mut orch, _) = controller(
        &config,
        EncodingMatcher::new(gallery, faces),
        |i| i.short_press().credential("1234"),
        MemoryEventLog::new(),
    );

    next_cycle(&mut orch);

    let denial = &orch.event_log().records()[0];
    assert_eq!(denial.event, EventKind::DeniedUnknown);
    assert_eq!(denial.subject.as_deref(), Some("Unknown"));
    assert_eq!(denial.detail, None);
}
