//! Session orchestrator: the access-control state machine
//!
//! ```text
//! Idle ─▶ Cooldown ─▶ AwaitingInput ─short─▶ BiometricPhase ─grant─▶ Granted ─▶ Cooldown
//!            ▲              │                      │
//!            └────long──────┘                   denied
//!            ▲                                     ▼
//!            └──────── lockout ◀──────────── PinPhase ─grant─▶ Granted
//! ```
//!
//! Everything runs on one thread and every phase blocks until done, so
//! attempts are strictly serialized. Only operator cancellation ends the
//! loop.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::biometric::{AttemptOutcome, BiometricEngine};
use crate::clock::Clock;
use crate::credentials::CredentialStore;
use crate::event_log::{EventKind, EventRecorder, EventSink, LogRecord};
use crate::indicator::{BlinkPattern, Indicator, IndicatorController, IndicatorDriver};
use crate::input::{Cancelled, InputDevice, PressKind};
use crate::matcher::BiometricMatcher;
use crate::pin::{ChallengeOutcome, PinChallenge};
use crate::session::SessionState;

/// Poll interval while waiting out the cooldown
pub const COOLDOWN_POLL: Duration = Duration::from_millis(50);

/// Where the orchestrator currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Cooldown,
    AwaitingInput,
    BiometricPhase,
    DeniedFallback,
    PinPhase,
    Granted,
}

/// What a single [`Orchestrator::step`] did
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// Still inside the cooldown window; nothing started
    CoolingDown,
    /// Long press toggled silent mode to the contained value
    SilentToggled(bool),
    /// Biometric grant
    GrantedFace(AttemptOutcome),
    /// Biometric denial followed by a PIN challenge
    PinChallenge {
        biometric: AttemptOutcome,
        challenge: ChallengeOutcome,
    },
}

impl CycleOutcome {
    pub fn is_granted(&self) -> bool {
        match self {
            CycleOutcome::GrantedFace(_) => true,
            CycleOutcome::PinChallenge { challenge, .. } => challenge.is_granted(),
            _ => false,
        }
    }
}

/// Why the run loop ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionExit {
    Cancelled,
}

/// Owns the session state and all injected devices
pub struct Orchestrator<M, I, D, C, L> {
    store: CredentialStore,
    matcher: M,
    input: I,
    indicators: IndicatorController<D, C>,
    clock: C,
    recorder: EventRecorder<L>,
    state: SessionState,
    phase: Phase,
}

impl<M, I, D, C, L> Orchestrator<M, I, D, C, L>
where
    M: BiometricMatcher,
    I: InputDevice,
    D: IndicatorDriver,
    C: Clock + Clone,
    L: EventSink,
{
    pub fn new(store: CredentialStore, matcher: M, input: I, driver: D, clock: C, sink: L) -> Self {
        Self {
            store,
            matcher,
            input,
            indicators: IndicatorController::new(driver, clock.clone()),
            clock,
            recorder: EventRecorder::new(sink),
            state: SessionState::new(),
            phase: Phase::Idle,
        }
    }

    /// Announce the roster and log the start record
    pub fn start(&mut self) {
        let roster = self.store.roster();
        info!("SYSTEM START");
        info!("Authorized: {:?}", roster.authorized().collect::<Vec<_>>());
        info!("Admin: {:?}", roster.admin().collect::<Vec<_>>());
        self.recorder.event(EventKind::Start);
    }

    /// Run forever; returns only when the operator cancels
    pub fn run(&mut self) -> SessionExit {
        self.start();
        loop {
            if let Err(Cancelled) = self.step() {
                self.indicators.idle();
                self.phase = Phase::Idle;
                info!("Exit");
                return SessionExit::Cancelled;
            }
        }
    }

    /// One pass of the control loop
    pub fn step(&mut self) -> Result<CycleOutcome, Cancelled> {
        self.indicators.idle();

        let cooldown = self.store.policy().cooldown;
        if self.state.in_cooldown(self.clock.now(), cooldown) {
            self.phase = Phase::Cooldown;
            self.clock.sleep(COOLDOWN_POLL);
            return Ok(CycleOutcome::CoolingDown);
        }

        self.phase = Phase::AwaitingInput;
        info!("READY  Press button (short)  Long press=Silent toggle");
        let press = self.input.next_press()?;
        self.state.mark_attempt(self.clock.now());

        if press == PressKind::Long {
            return Ok(self.toggle_silent());
        }

        self.phase = Phase::BiometricPhase;
        info!("CAPTURE  Checking face");
        self.indicators.blink(Indicator::Grant, BlinkPattern::CAPTURE_ACK);

        let retries = self.store.policy().biometric_retries;
        let biometric = BiometricEngine::new(&self.store).attempt_with_retries(
            &mut self.matcher,
            &mut self.indicators,
            retries,
        );
        self.recorder.record(biometric.log_record());

        if let AttemptOutcome::Granted {
            identity,
            confidence,
            basis,
        } = &biometric
        {
            info!("GRANTED  {}  dist={:.3}  ({:?})", identity, confidence, basis);
            self.state.reset_bad_pins();
            self.grant();
            return Ok(CycleOutcome::GrantedFace(biometric));
        }

        self.phase = Phase::DeniedFallback;
        match &biometric {
            AttemptOutcome::DeniedNoSubject => warn!("DENIED  No face detected"),
            other => match other.confidence().filter(|d| d.is_finite()) {
                Some(distance) => warn!("DENIED  best={}  dist={:.3}", best_label(other), distance),
                None => warn!("DENIED  best={}", best_label(other)),
            },
        }
        self.indicators.set_steady(Indicator::Deny, true);

        self.phase = Phase::PinPhase;
        let challenge = PinChallenge::new(&self.store).run(
            &mut self.state,
            &mut self.input,
            &mut self.indicators,
            &mut self.recorder,
        )?;

        if challenge.is_granted() {
            self.grant();
        } else {
            self.phase = Phase::Cooldown;
        }
        Ok(CycleOutcome::PinChallenge {
            biometric,
            challenge,
        })
    }

    fn toggle_silent(&mut self) -> CycleOutcome {
        let silent = self.state.toggle_silent();
        self.indicators.set_silent(silent);
        info!("SILENT MODE {}", if silent { "ON" } else { "OFF" });
        self.recorder
            .record(LogRecord::now(EventKind::SilentToggle).with_subject(on_off(silent)));
        self.indicators.blink(Indicator::Deny, BlinkPattern::SILENT_ACK);
        self.phase = Phase::Cooldown;
        CycleOutcome::SilentToggled(silent)
    }

    fn grant(&mut self) {
        self.phase = Phase::Granted;
        let hold = self.store.policy().unlock_duration;
        debug!("Unlocking for {:?}", hold);
        self.indicators.unlock(hold);
        self.phase = Phase::Cooldown;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn indicators(&self) -> &IndicatorController<D, C> {
        &self.indicators
    }

    pub fn event_log(&self) -> &L {
        self.recorder.sink()
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    pub fn input(&self) -> &I {
        &self.input
    }
}

fn best_label(outcome: &AttemptOutcome) -> &str {
    match outcome {
        AttemptOutcome::Granted { identity, .. }
        | AttemptOutcome::DeniedKnownButUnauthorized { identity, .. } => identity.as_str(),
        AttemptOutcome::DeniedUnknown { best_guess, .. } => best_guess.as_str(),
        AttemptOutcome::DeniedNoSubject => "",
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
