use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};

use crate::control::{ControlHandle, ControlMessage};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/control", get(control_socket))
}

async fn control_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_control(socket, state))
}

/// What the reader asks the connection to do with one inbound text frame.
#[derive(Debug, PartialEq)]
enum ControlAction {
    Next,
    Reply(Value),
}

fn classify(text: &str) -> ControlAction {
    let Ok(obj) = serde_json::from_str::<Value>(text) else {
        return ControlAction::Reply(json!({ "error": "invalid_json" }));
    };
    match obj.get("type").and_then(Value::as_str) {
        Some("next") => ControlAction::Next,
        _ => ControlAction::Reply(json!({ "type": "error", "detail": "unknown_type" })),
    }
}

async fn handle_control(socket: WebSocket, state: AppState) {
    let control: ControlHandle = state.control().clone();
    let mut poses = control.subscribe();
    let mut shutdown = state.shutdown_rx();
    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<Value>(16);

    tracing::info!(subscribers = control.subscriber_count(), "Control connection opened");

    let mut writer = tokio::spawn(async move {
        loop {
            let out = tokio::select! {
                pose = poses.recv() => match pose {
                    Ok(msg @ ControlMessage::Pose { .. }) => serde_json::to_value(&msg).ok(),
                    Ok(ControlMessage::Next) => None,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Control connection lagging");
                        None
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(v) => Some(v),
                    None => break,
                },
                _ = shutdown.recv() => break,
            };
            if let Some(value) = out {
                if sender.send(Message::Text(value.to_string().into())).await.is_err() {
                    break;
                }
            }
        }
        let _ = sender.close().await;
    });

    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            match classify(&text) {
                ControlAction::Next => {
                    if let Err(e) = control.submit_next().await {
                        tracing::warn!(error = %e, "Control hub rejected next request");
                    }
                }
                ControlAction::Reply(value) => {
                    if reply_tx.send(value).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Whichever side stops first takes the other down.
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }
    tracing::info!("Control connection closed");
}
