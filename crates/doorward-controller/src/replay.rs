//! Matchers available to the console controller
//!
//! Face capture and encoding live outside this repository. For bench runs
//! the controller replays recorded matcher output from a JSON file:
//!
//! ```json
//! [
//!   [],
//!   [{ "label": "seif", "distance": 0.31 }],
//!   [{ "scores": [{ "label": "baher", "distance": 0.62 }, { "label": "hamza", "distance": 0.48 }] }]
//! ]
//! ```
//!
//! Each element is one frame. A frame lists the detected subjects, either
//! reduced to their best match or with full per-identity scores. Frames are
//! replayed in order and wrap around.

use std::path::Path;

use doorward_core::{BiometricMatcher, Detection, MatcherError, Score};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ControllerError, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FrameEntry {
    Best(Score),
    Full(Detection),
}

impl From<FrameEntry> for Detection {
    fn from(entry: FrameEntry) -> Self {
        match entry {
            FrameEntry::Best(score) => Detection::new(vec![score]),
            FrameEntry::Full(detection) => detection,
        }
    }
}

/// Replays recorded frames in a loop
#[derive(Debug, Clone)]
pub struct ReplayMatcher {
    frames: Vec<Vec<Detection>>,
    cursor: usize,
}

impl ReplayMatcher {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self { frames, cursor: 0 }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<Vec<FrameEntry>> = serde_json::from_str(json)?;
        let frames = raw
            .into_iter()
            .map(|frame| frame.into_iter().map(Detection::from).collect())
            .collect();
        Ok(Self::new(frames))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ControllerError::Replay(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl BiometricMatcher for ReplayMatcher {
    fn detect_and_match(&mut self) -> std::result::Result<Vec<Detection>, MatcherError> {
        if self.frames.is_empty() {
            return Ok(Vec::new());
        }
        let frame = self.frames[self.cursor].clone();
        debug!("Replaying frame {} ({} subjects)", self.cursor, frame.len());
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(frame)
    }
}

/// Matcher for runs with no camera: every capture fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableMatcher;

impl BiometricMatcher for UnavailableMatcher {
    fn detect_and_match(&mut self) -> std::result::Result<Vec<Detection>, MatcherError> {
        Err(MatcherError::CaptureFailed("no camera configured".into()))
    }
}
