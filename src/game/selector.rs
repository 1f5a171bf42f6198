use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::control::ControlHandle;
use crate::pose::PoseDefinition;

/// Uniform pick among the selectable poses.
pub fn random_pose<R: Rng + ?Sized>(rng: &mut R) -> PoseDefinition {
    *PoseDefinition::SELECTABLE
        .choose(rng)
        .unwrap_or(&PoseDefinition::ArmsDown)
}

/// Resolves the next target so that it always differs from `current`.
///
/// A requested name wins when it is known, selectable and different; anything
/// else (unknown name, same pose, no request) falls back to a uniform pick over
/// the selectable poses minus `current`.
pub fn choose_different<R: Rng + ?Sized>(
    current: PoseDefinition,
    requested: Option<&str>,
    rng: &mut R,
) -> PoseDefinition {
    if let Some(pose) = requested.and_then(PoseDefinition::from_name) {
        if pose.is_selectable() && pose != current {
            return pose;
        }
        tracing::debug!(requested = %pose, current = %current, "Requested pose rejected, picking locally");
    }

    let candidates: Vec<PoseDefinition> = PoseDefinition::SELECTABLE
        .iter()
        .copied()
        .filter(|p| *p != current)
        .collect();
    *candidates.choose(rng).unwrap_or(&current)
}

/// Asks the control channel for the next pose name, bounded by a timeout.
#[derive(Clone)]
pub struct PoseSelector {
    control: Option<ControlHandle>,
    reply_timeout: Duration,
}

impl PoseSelector {
    pub fn new(control: Option<ControlHandle>, reply_timeout: Duration) -> Self {
        Self {
            control,
            reply_timeout,
        }
    }

    /// Selector that always picks locally.
    pub fn local() -> Self {
        Self::new(None, Duration::ZERO)
    }

    pub fn has_control_channel(&self) -> bool {
        self.control.is_some()
    }

    /// `None` means the caller should pick locally.
    pub async fn request_next(&self) -> Option<String> {
        let control = self.control.as_ref()?;
        match tokio::time::timeout(self.reply_timeout, control.request_next()).await {
            Ok(Ok(name)) => Some(name),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Control channel unavailable, using local selection");
                None
            }
            Err(_) => {
                tracing::debug!(
                    timeout_ms = self.reply_timeout.as_millis() as u64,
                    "Control channel reply timed out, using local selection"
                );
                None
            }
        }
    }
}
