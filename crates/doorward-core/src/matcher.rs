//! Biometric matcher contract
//!
//! The matcher captures one frame and reports, for every subject it
//! detected, the distance to each enrolled identity. An empty list means no
//! subject was in view. Capture and encoding are external.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distance from a detected subject to one enrolled identity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub label: String,
    pub distance: f64,
}

impl Score {
    pub fn new(label: impl Into<String>, distance: f64) -> Self {
        Self {
            label: label.into(),
            distance,
        }
    }
}

/// One detected subject and its distances to the enrolled set
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub scores: Vec<Score>,
}

impl Detection {
    pub fn new(scores: Vec<Score>) -> Self {
        Self { scores }
    }

    /// A subject already reduced to its best enrolled match
    pub fn single(label: impl Into<String>, distance: f64) -> Self {
        Self {
            scores: vec![Score::new(label, distance)],
        }
    }

    /// Lowest-distance score; the first one wins on ties
    pub fn best(&self) -> Option<&Score> {
        self.scores.iter().fold(None, |best, score| match best {
            Some(current) if current.distance <= score.distance => Some(current),
            Some(current) if score.distance.is_nan() => Some(current),
            _ => Some(score),
        })
    }
}

/// Hard failures a matcher can signal, distinct from "no subject"
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("matcher backend failed: {0}")]
    Backend(String),
}

/// External biometric matcher
pub trait BiometricMatcher {
    /// Capture one frame and score every detected subject
    fn detect_and_match(&mut self) -> Result<Vec<Detection>, MatcherError>;
}

impl<M: BiometricMatcher + ?Sized> BiometricMatcher for Box<M> {
    fn detect_and_match(&mut self) -> Result<Vec<Detection>, MatcherError> {
        (**self).detect_and_match()
    }
}
