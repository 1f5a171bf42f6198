use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::extractors::QueryParams;
use crate::game::{ClientMessage, GameEngine, GameSession, SessionEvent};
use crate::response::AppError;
use crate::state::{AppState, SessionPermit};

const INBOX_CAPACITY: usize = 64;
const OUTBOX_CAPACITY: usize = 32;

pub fn router() -> Router<AppState> {
    Router::new().route("/play", get(play_socket))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayQuery {
    pub player_id: Option<String>,
    pub name: Option<String>,
}

/// Capacity is checked before the upgrade so a full server answers 429.
async fn play_socket(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PlayQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, AppError> {
    let permit = state.try_acquire_session().ok_or_else(|| {
        AppError::too_many_sessions("Too many concurrent play sessions, try again later")
    })?;
    let ws = ws.map_err(|e| AppError::bad_request("WEBSOCKET_REQUIRED", &e.body_text()))?;
    Ok(ws.on_upgrade(move |socket| handle_play(socket, state, query, permit)))
}

async fn handle_play(socket: WebSocket, state: AppState, query: PlayQuery, _permit: SessionPermit) {
    let (mut sender, mut receiver) = socket.split();
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(INBOX_CAPACITY);
    let (out_tx, mut out_rx) = mpsc::channel(OUTBOX_CAPACITY);

    let session = GameSession::new(
        GameEngine::new(tokio::time::Instant::now().into_std()),
        state.store().clone(),
        state.pose_selector(),
        out_tx,
        state.config().session.frame_publish_interval(),
    );

    if let Some(player_id) = query.player_id.filter(|id| !id.is_empty()) {
        let _ = event_tx
            .send(SessionEvent::Identify {
                player_id,
                name: query.name,
            })
            .await;
    }
    let mut session_task = session.spawn(event_rx, state.shutdown_rx());

    let mut writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode state message");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let reader_tx = event_tx.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if reader_tx.send(msg.into()).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Discarding malformed play message"),
            }
        }
    });

    tokio::select! {
        _ = &mut reader => {
            let _ = event_tx.send(SessionEvent::Shutdown).await;
            let _ = (&mut session_task).await;
            writer.abort();
        }
        _ = &mut session_task => {
            reader.abort();
            let _ = writer.await;
        }
    }
}
