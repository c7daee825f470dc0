//! Enrolled face encodings and a distance-based matcher over them

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matcher::{BiometricMatcher, Detection, MatcherError, Score};

/// Enrolled encodings, one label per encoding (a label may repeat)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Gallery {
    names: Vec<String>,
    encodings: Vec<Vec<f64>>,
}

impl Gallery {
    pub fn new(names: Vec<String>, encodings: Vec<Vec<f64>>) -> Result<Self> {
        let gallery = Self { names, encodings };
        gallery.validate()?;
        Ok(gallery)
    }

    /// Load a gallery from `{"names": [...], "encodings": [[...], ...]}`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let gallery: Self = serde_json::from_str(&content)?;
        gallery.validate()?;
        Ok(gallery)
    }

    fn validate(&self) -> Result<()> {
        if self.names.len() != self.encodings.len() {
            return Err(Error::InvalidRoster(format!(
                "{} names for {} encodings",
                self.names.len(),
                self.encodings.len()
            )));
        }
        if let Some(first) = self.encodings.first() {
            if self.encodings.iter().any(|e| e.len() != first.len()) {
                return Err(Error::InvalidRoster(
                    "encodings have mixed dimensions".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Euclidean distance from `probe` to every enrolled encoding
    pub fn score(&self, probe: &[f64]) -> Detection {
        let scores = self
            .names
            .iter()
            .zip(&self.encodings)
            .map(|(name, enrolled)| Score::new(name.clone(), euclidean(enrolled, probe)))
            .collect();
        Detection::new(scores)
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Camera plus face encoder, external to the controller
pub trait FaceSource {
    /// Capture a frame and return one encoding per detected face
    fn capture_encodings(&mut self) -> std::result::Result<Vec<Vec<f64>>, MatcherError>;
}

/// [`BiometricMatcher`] that scores captured encodings against a [`Gallery`]
pub struct EncodingMatcher<S> {
    gallery: Gallery,
    source: S,
}

impl<S: FaceSource> EncodingMatcher<S> {
    pub fn new(gallery: Gallery, source: S) -> Self {
        Self { gallery, source }
    }
}

impl<S: FaceSource> BiometricMatcher for EncodingMatcher<S> {
    fn detect_and_match(&mut self) -> std::result::Result<Vec<Detection>, MatcherError> {
        let encodings = self.source.capture_encodings()?;
        Ok(encodings
            .iter()
            .map(|probe| self.gallery.score(probe))
            .collect())
    }
}
