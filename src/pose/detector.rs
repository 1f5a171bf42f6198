use serde::Serialize;
use thiserror::Error;

use crate::pose::landmark::Landmark;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("could not decode image bytes: {0}")]
    Decode(String),
    #[error("landmark detector unavailable")]
    Unavailable,
}

/// Turns one encoded camera frame into body landmarks.
///
/// The detection backend runs outside this service; implementations adapt it.
pub trait LandmarkDetector: Send + Sync {
    fn detect(&self, image: &[u8]) -> Result<Vec<Landmark>, DetectError>;
}

/// Placeholder used when no detection backend is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDetector;

impl LandmarkDetector for UnavailableDetector {
    fn detect(&self, image: &[u8]) -> Result<Vec<Landmark>, DetectError> {
        if image.is_empty() {
            return Err(DetectError::Decode("empty frame".to_string()));
        }
        Err(DetectError::Unavailable)
    }
}

/// Landmark channel reply for a single frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReply {
    pub landmarks: Vec<Landmark>,
    pub has_pose: bool,
}

impl DetectionReply {
    pub fn from_landmarks(landmarks: Vec<Landmark>) -> Self {
        let has_pose = !landmarks.is_empty();
        Self {
            landmarks,
            has_pose,
        }
    }
}
