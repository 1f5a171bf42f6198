use serde::{Deserialize, Serialize};

use crate::constants::MAX_LANDMARK_INDEX;

/// MediaPipe pose landmark indices used by the scorer.
pub mod idx {
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_INDEX: usize = 19;
    pub const RIGHT_INDEX: usize = 20;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
}

/// A single tracked body keypoint as reported by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub index: usize,
    #[serde(default)]
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(index: usize, x: f64, y: f64, visibility: f64) -> Self {
        Self {
            index,
            name: index.to_string(),
            x,
            y,
            z: 0.0,
            visibility,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.visibility.is_finite()
    }

    /// Finite coordinates and an index inside the pose model's range.
    pub fn is_usable(&self) -> bool {
        self.index < MAX_LANDMARK_INDEX && self.is_finite()
    }
}

/// One detector frame. Pixel coordinates are normalized when the image size is known.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkFrame {
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl LandmarkFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self {
            landmarks,
            width: None,
            height: None,
        }
    }

    /// Landmarks in 0..1 frame space. Non-finite points and out-of-range indices are dropped.
    pub fn into_normalized(self) -> Vec<Landmark> {
        let sx = self.width.filter(|w| *w > 0.0);
        let sy = self.height.filter(|h| *h > 0.0);

        self.landmarks
            .into_iter()
            .filter(Landmark::is_usable)
            .map(|mut lm| {
                if let Some(w) = sx {
                    lm.x /= w;
                    lm.z /= w;
                }
                if let Some(h) = sy {
                    lm.y /= h;
                }
                lm.visibility = lm.visibility.clamp(0.0, 1.0);
                lm
            })
            .collect()
    }
}

/// Index-addressed view over a landmark slice.
///
/// Detector output is usually dense and ordered, but frames replayed from
/// clients can be sparse, so lookups fall back to a scan on index mismatch.
pub fn find(landmarks: &[Landmark], index: usize) -> Option<&Landmark> {
    match landmarks.get(index) {
        Some(lm) if lm.index == index => Some(lm),
        _ => landmarks.iter().find(|lm| lm.index == index),
    }
}
