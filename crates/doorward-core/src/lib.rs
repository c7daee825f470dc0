//! Doorward Core - Authentication state machine for a single-door controller
//!
//! This crate decides whether to unlock a door given a biometric sample and,
//! on failure, a fallback PIN:
//! - Biometric attempts with retry and first-acceptable-wins matching
//! - PIN challenge with emergency override and lockout
//! - Global cooldown between attempt cycles
//! - Operator-toggled silent mode for indicator feedback
//! - Append-only event log
//!
//! Hardware is reached only through the capability traits in [`indicator`],
//! [`input`], [`matcher`] and [`clock`], so every device can be replaced by
//! the simulators in the `testing` module (behind the `testing` feature).

pub mod biometric;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod event_log;
pub mod gallery;
pub mod indicator;
pub mod input;
pub mod matcher;
pub mod orchestrator;
pub mod pin;
pub mod roster;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use biometric::{AttemptOutcome, BiometricEngine};
pub use clock::{Clock, SystemClock};
pub use credentials::{AccessPolicy, CredentialStore, PinClass, PinSecret};
pub use error::{Error, Result};
pub use event_log::{
    CsvEventLog, Detail, EventKind, EventRecorder, EventSink, LogRecord, MemoryEventLog,
};
pub use gallery::{EncodingMatcher, FaceSource, Gallery};
pub use indicator::{
    BlinkPattern, Indicator, IndicatorController, IndicatorDriver, Signal, MAX_HOLD,
};
pub use input::{Cancelled, InputDevice, PressKind, LONG_PRESS_THRESHOLD};
pub use matcher::{BiometricMatcher, Detection, MatcherError, Score};
pub use orchestrator::{CycleOutcome, Orchestrator, Phase, SessionExit};
pub use pin::{ChallengeOutcome, PinChallenge};
pub use roster::{GrantBasis, Roster};
pub use session::SessionState;
