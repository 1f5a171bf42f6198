use crate::constants::{MAX_LANDMARK_INDEX, SMOOTHING_ALPHA};
use crate::pose::landmark::Landmark;

/// Per-index exponential moving average over landmark frames.
///
/// The smoothed buffer is the only cross-frame state in the scoring pipeline.
/// It is keyed by detector index, so a slot that appears for the first time
/// starts from its raw value.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    alpha: f64,
    state: Vec<Option<Landmark>>,
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new(SMOOTHING_ALPHA)
    }
}

impl LandmarkSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: vec![None; MAX_LANDMARK_INDEX],
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_primed(&self) -> bool {
        self.state.iter().any(Option::is_some)
    }

    /// Drops all EMA state; the next frame is taken verbatim.
    pub fn reset(&mut self) {
        self.state.fill(None);
    }

    /// Feeds one raw frame and returns the smoothed frame in input order.
    /// Indices outside the pose model are skipped.
    pub fn apply(&mut self, raw: &[Landmark]) -> Vec<Landmark> {
        let a = self.alpha;
        let mut out = Vec::with_capacity(raw.len());

        for lm in raw {
            let Some(slot) = self.state.get_mut(lm.index) else {
                continue;
            };

            let next = match slot.as_ref() {
                Some(prev) => Landmark {
                    index: lm.index,
                    name: lm.name.clone(),
                    x: a * lm.x + (1.0 - a) * prev.x,
                    y: a * lm.y + (1.0 - a) * prev.y,
                    z: a * lm.z + (1.0 - a) * prev.z,
                    visibility: a * lm.visibility + (1.0 - a) * prev.visibility,
                },
                None => lm.clone(),
            };

            *slot = Some(next.clone());
            out.push(next);
        }

        out
    }
}
