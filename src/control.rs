//! Pose director shared by control sockets and game sessions.
//!
//! A single task owns the pose list and the RNG. `next` requests from any
//! source are answered by broadcasting `{"type":"pose","pose":...}` to every
//! control subscriber; in-process callers additionally get the name back
//! through a oneshot reply.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::pose::PoseDefinition;

const REQUEST_QUEUE: usize = 64;
const BROADCAST_CAPACITY: usize = 32;

/// Messages carried on the control channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Next,
    Pose { pose: String },
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control hub is not running")]
    Closed,
}

enum ControlRequest {
    Next {
        reply: Option<oneshot::Sender<String>>,
    },
}

#[derive(Clone)]
pub struct ControlHandle {
    requests: mpsc::Sender<ControlRequest>,
    poses: broadcast::Sender<ControlMessage>,
}

impl ControlHandle {
    /// Asks for the next pose and waits for the hub's pick.
    pub async fn request_next(&self) -> Result<String, ControlError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(ControlRequest::Next { reply: Some(tx) })
            .await
            .map_err(|_| ControlError::Closed)?;
        rx.await.map_err(|_| ControlError::Closed)
    }

    /// Fire-and-forget `next`; the answer arrives on the broadcast.
    pub async fn submit_next(&self) -> Result<(), ControlError> {
        self.requests
            .send(ControlRequest::Next { reply: None })
            .await
            .map_err(|_| ControlError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlMessage> {
        self.poses.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.poses.receiver_count()
    }
}

pub struct ControlHub {
    pose_names: Vec<String>,
    rng: StdRng,
    requests: mpsc::Receiver<ControlRequest>,
    poses: broadcast::Sender<ControlMessage>,
}

impl ControlHub {
    /// Starts the hub over the selectable poses.
    pub fn spawn(shutdown: broadcast::Receiver<()>) -> (ControlHandle, JoinHandle<()>) {
        let names = PoseDefinition::SELECTABLE
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        Self::spawn_with(names, StdRng::from_entropy(), shutdown)
    }

    pub fn spawn_with(
        pose_names: Vec<String>,
        rng: StdRng,
        shutdown: broadcast::Receiver<()>,
    ) -> (ControlHandle, JoinHandle<()>) {
        let (req_tx, req_rx) = mpsc::channel(REQUEST_QUEUE);
        let (pose_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        let hub = Self {
            pose_names,
            rng,
            requests: req_rx,
            poses: pose_tx.clone(),
        };
        let handle = ControlHandle {
            requests: req_tx,
            poses: pose_tx,
        };
        let task = tokio::spawn(hub.run(shutdown));
        (handle, task)
    }

    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(poses = ?self.pose_names, "Control hub started");
        loop {
            tokio::select! {
                req = self.requests.recv() => match req {
                    Some(ControlRequest::Next { reply }) => self.on_next(reply),
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }
        tracing::info!("Control hub stopped");
    }

    fn on_next(&mut self, reply: Option<oneshot::Sender<String>>) {
        let Some(pose) = self.pose_names.choose(&mut self.rng).cloned() else {
            tracing::warn!("Control hub has no poses configured");
            return;
        };

        // No subscribers is fine: in-process callers still get the reply.
        let delivered = self
            .poses
            .send(ControlMessage::Pose { pose: pose.clone() })
            .unwrap_or(0);
        tracing::debug!(%pose, delivered, "Next pose chosen");

        if let Some(tx) = reply {
            let _ = tx.send(pose);
        }
    }
}
