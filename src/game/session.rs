//! Per-connection play session.
//!
//! One task owns the [`GameEngine`]; the 1 Hz tick, landmark frames, restart
//! and identity events are all handled in that task, so the engine never sees
//! two mutations at once.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::constants::TICK_PERIOD_MS;
use crate::game::engine::{Award, GameEngine, GameSnapshot, RoundEnd, TickOutcome, Verdict};
use crate::game::selector::PoseSelector;
use crate::pose::{Landmark, LandmarkFrame};
use crate::store::Store;
use crate::validation::normalize_player_name;

#[derive(Debug)]
pub enum SessionEvent {
    Frame(LandmarkFrame),
    Restart,
    Identify {
        player_id: String,
        name: Option<String>,
    },
    Shutdown,
}

/// Messages a play client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Landmarks {
        landmarks: Vec<Landmark>,
        #[serde(default)]
        width: Option<f64>,
        #[serde(default)]
        height: Option<f64>,
    },
    Restart,
    Identify {
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl From<ClientMessage> for SessionEvent {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Landmarks {
                landmarks,
                width,
                height,
            } => SessionEvent::Frame(LandmarkFrame {
                landmarks,
                width,
                height,
            }),
            ClientMessage::Restart => SessionEvent::Restart,
            ClientMessage::Identify { player_id, name } => {
                SessionEvent::Identify { player_id, name }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    State(GameSnapshot),
}

#[derive(Debug, Clone)]
struct PlayerIdentity {
    id: String,
    name: String,
}

pub struct GameSession {
    engine: GameEngine,
    store: Arc<Store>,
    selector: PoseSelector,
    outbound: mpsc::Sender<ServerMessage>,
    player: Option<PlayerIdentity>,
    frame_publish_interval: Duration,
    last_frame_publish: Option<Instant>,
}

fn engine_now() -> std::time::Instant {
    Instant::now().into_std()
}

impl GameSession {
    pub fn new(
        engine: GameEngine,
        store: Arc<Store>,
        selector: PoseSelector,
        outbound: mpsc::Sender<ServerMessage>,
        frame_publish_interval: Duration,
    ) -> Self {
        Self {
            engine,
            store,
            selector,
            outbound,
            player: None,
            frame_publish_interval,
            last_frame_publish: None,
        }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player.as_ref().map(|p| p.id.as_str())
    }

    pub fn spawn(
        self,
        inbox: mpsc::Receiver<SessionEvent>,
        shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(inbox, shutdown))
    }

    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<SessionEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let period = Duration::from_millis(TICK_PERIOD_MS);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(pose = %self.engine.target_pose(), "Play session started");
        self.publish().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick().await,
                event = inbox.recv() => match event {
                    Some(SessionEvent::Shutdown) | None => break,
                    Some(event) => self.on_event(event).await,
                },
                _ = shutdown.recv() => break,
            }
            if self.outbound.is_closed() {
                break;
            }
        }

        tracing::info!(
            score = self.engine.session().score,
            round = self.engine.round().round,
            "Play session ended"
        );
    }

    pub async fn on_tick(&mut self) {
        if let TickOutcome::RoundEnded(end) = self.engine.tick(engine_now()) {
            self.finish_round(end).await;
        }
        self.publish().await;
    }

    pub async fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Frame(frame) => {
                let landmarks = frame.into_normalized();
                self.engine.observe_frame(&landmarks);
                let now = Instant::now();
                let due = self
                    .last_frame_publish
                    .map_or(true, |last| now.duration_since(last) >= self.frame_publish_interval);
                if due {
                    self.last_frame_publish = Some(now);
                    self.publish().await;
                }
            }
            SessionEvent::Restart => {
                self.engine.restart(engine_now());
                self.publish().await;
            }
            SessionEvent::Identify { player_id, name } => {
                self.identify(player_id, name.as_deref());
                self.publish().await;
            }
            SessionEvent::Shutdown => {}
        }
    }

    fn identify(&mut self, player_id: String, name: Option<&str>) {
        if !self.store.is_identity_active(&player_id) {
            tracing::warn!(player_id = %player_id, "Unknown or revoked identity, ignoring");
            return;
        }
        let name = normalize_player_name(name);
        match self.store.get_player(&player_id) {
            Ok(Some(record)) => self.engine.record_completed_total(record.completed_count),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to load player record"),
        }
        tracing::info!(player_id = %player_id, name = %name, "Player identified");
        self.player = Some(PlayerIdentity {
            id: player_id,
            name,
        });
    }

    async fn finish_round(&mut self, end: RoundEnd) {
        if let Verdict::Awarded(award) = &end.verdict {
            self.persist_award(award).await;
        }
        if end.next_pose_needed {
            let requested = self.selector.request_next().await;
            let next = self.engine.set_pose_idx_different(requested.as_deref());
            tracing::debug!(pose = %next, from_control = requested.is_some(), "Next target set");
        }
    }

    async fn persist_award(&mut self, award: &Award) {
        let Some(player) = self.player.clone() else {
            tracing::info!(round = award.round, "Identity not ready, award kept locally only");
            return;
        };
        if !self.store.is_identity_active(&player.id) {
            tracing::warn!(player_id = %player.id, round = award.round, "Identity revoked, award kept locally only");
            self.player = None;
            return;
        }

        let store = self.store.clone();
        let pose = award.pose.name();
        let result = tokio::task::spawn_blocking(move || {
            store.record_completion(&player.id, &player.name, pose)
        })
        .await;

        match result {
            Ok(Ok(completed)) => self.engine.record_completed_total(completed),
            Ok(Err(e)) => tracing::warn!(error = %e, round = award.round, "Failed to persist completion"),
            Err(e) => tracing::warn!(error = %e, round = award.round, "Completion task failed"),
        }
    }

    async fn publish(&self) {
        let snapshot = self.engine.snapshot(engine_now());
        if self.outbound.send(ServerMessage::State(snapshot)).await.is_err() {
            tracing::debug!("Play socket closed, state dropped");
        }
    }
}
