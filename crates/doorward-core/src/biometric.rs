//! Biometric attempt engine
//!
//! Subjects are scanned in detection order and the first one that is both
//! under the acceptance threshold and on the roster is granted immediately,
//! even when another subject in the same frame matches more closely. This
//! keeps the decision latency low; it is a policy, so changing it to
//! best-overall-wins changes who gets through the door.

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::credentials::CredentialStore;
use crate::event_log::{Detail, EventKind, LogRecord};
use crate::indicator::{BlinkPattern, Indicator, IndicatorController, IndicatorDriver, RETRY_PAUSE};
use crate::matcher::{BiometricMatcher, Detection};
use crate::roster::{GrantBasis, Roster};

/// Label reported when no enrolled identity could be scored
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Result of one or more biometric attempts
#[derive(Clone, Debug, PartialEq)]
pub enum AttemptOutcome {
    Granted {
        identity: String,
        confidence: f64,
        basis: GrantBasis,
    },
    DeniedNoSubject,
    /// Best guess was above the threshold (or nothing was enrolled)
    DeniedUnknown { best_guess: String, confidence: f64 },
    /// Best guess was close enough but is not on the roster
    DeniedKnownButUnauthorized { identity: String, confidence: f64 },
}

impl AttemptOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AttemptOutcome::Granted { .. })
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            AttemptOutcome::Granted { confidence, .. }
            | AttemptOutcome::DeniedUnknown { confidence, .. }
            | AttemptOutcome::DeniedKnownButUnauthorized { confidence, .. } => Some(*confidence),
            AttemptOutcome::DeniedNoSubject => None,
        }
    }

    /// The log record describing this outcome
    pub fn log_record(&self) -> LogRecord {
        match self {
            AttemptOutcome::Granted {
                identity,
                confidence,
                ..
            } => LogRecord::now(EventKind::GrantedFace)
                .with_subject(identity.as_str())
                .with_detail(Detail::Distance(*confidence)),
            AttemptOutcome::DeniedNoSubject => LogRecord::now(EventKind::DeniedNoFace),
            AttemptOutcome::DeniedUnknown {
                best_guess,
                confidence,
            } if !confidence.is_finite() => {
                LogRecord::now(EventKind::DeniedUnknown).with_subject(best_guess.as_str())
            }
            AttemptOutcome::DeniedUnknown {
                best_guess: label,
                confidence,
            }
            | AttemptOutcome::DeniedKnownButUnauthorized {
                identity: label,
                confidence,
            } => LogRecord::now(EventKind::DeniedFace)
                .with_subject(label.as_str())
                .with_detail(Detail::Distance(*confidence)),
        }
    }
}

/// Applies threshold and roster checks to matcher output
pub struct BiometricEngine<'a> {
    roster: &'a Roster,
    threshold: f64,
}

impl<'a> BiometricEngine<'a> {
    pub fn new(store: &'a CredentialStore) -> Self {
        Self {
            roster: store.roster(),
            threshold: store.policy().acceptance_threshold,
        }
    }

    /// Decide on one frame's detections
    pub fn evaluate(&self, detections: &[Detection]) -> AttemptOutcome {
        if detections.is_empty() {
            return AttemptOutcome::DeniedNoSubject;
        }

        let mut best: Option<(&str, f64)> = None;
        for detection in detections {
            let Some(score) = detection.best() else {
                continue;
            };

            if best.map_or(true, |(_, d)| score.distance < d) {
                best = Some((score.label.as_str(), score.distance));
            }

            if score.distance < self.threshold {
                if let Some(basis) = self.roster.grant_basis(&score.label) {
                    return AttemptOutcome::Granted {
                        identity: score.label.clone(),
                        confidence: score.distance,
                        basis,
                    };
                }
            }
        }

        match best {
            Some((label, distance)) if distance < self.threshold => {
                AttemptOutcome::DeniedKnownButUnauthorized {
                    identity: label.to_string(),
                    confidence: distance,
                }
            }
            Some((label, distance)) => AttemptOutcome::DeniedUnknown {
                best_guess: label.to_string(),
                confidence: distance,
            },
            None => AttemptOutcome::DeniedUnknown {
                best_guess: UNKNOWN_LABEL.to_string(),
                confidence: f64::INFINITY,
            },
        }
    }

    /// Capture one frame and evaluate it; matcher failures count as no subject
    pub fn attempt_once<M: BiometricMatcher>(&self, matcher: &mut M) -> AttemptOutcome {
        match matcher.detect_and_match() {
            Ok(detections) => {
                debug!("Matcher reported {} subject(s)", detections.len());
                self.evaluate(&detections)
            }
            Err(e) => {
                warn!("Biometric capture failed: {}", e);
                AttemptOutcome::DeniedNoSubject
            }
        }
    }

    /// Up to `retries + 1` attempts, stopping at the first grant
    ///
    /// A retry pulse on the grant indicator separates attempts. When every
    /// attempt fails the last attempt's outcome is returned.
    pub fn attempt_with_retries<M, D, C>(
        &self,
        matcher: &mut M,
        indicators: &mut IndicatorController<D, C>,
        retries: u32,
    ) -> AttemptOutcome
    where
        M: BiometricMatcher,
        D: IndicatorDriver,
        C: Clock,
    {
        let mut attempt: u32 = 1;
        loop {
            let outcome = self.attempt_once(matcher);
            if outcome.is_granted() || attempt > retries {
                return outcome;
            }
            info!("Face retry {}/{}", attempt, retries);
            indicators.blink(Indicator::Grant, BlinkPattern::RETRY_PULSE);
            indicators.pause(RETRY_PAUSE);
            attempt += 1;
        }
    }
}
