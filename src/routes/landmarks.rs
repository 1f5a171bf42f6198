use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};

use crate::pose::detector::{DetectError, DetectionReply, LandmarkDetector};
use crate::response::AppError;
use crate::state::AppState;

pub fn ws_router() -> Router<AppState> {
    Router::new().route("/", get(landmark_socket))
}

pub fn api_router() -> Router<AppState> {
    Router::new().route("/pose", post(detect_upload))
}

async fn run_detector(
    detector: Arc<dyn LandmarkDetector>,
    image: Bytes,
) -> Result<DetectionReply, DetectError> {
    match tokio::task::spawn_blocking(move || detector.detect(&image)).await {
        Ok(result) => result.map(DetectionReply::from_landmarks),
        Err(e) => {
            tracing::error!(error = %e, "Detector task failed");
            Err(DetectError::Unavailable)
        }
    }
}

fn detect_error_reply(err: &DetectError) -> Value {
    match err {
        DetectError::Decode(detail) => json!({ "error": "decode_failed", "detail": detail }),
        DetectError::Unavailable => {
            json!({ "error": "detector_unavailable", "detail": err.to_string() })
        }
    }
}

/// Single-image variant of the landmark channel; the body is the encoded image.
async fn detect_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    match run_detector(state.detector().clone(), body).await {
        Ok(reply) => Ok(Json(reply)),
        Err(DetectError::Decode(detail)) => Err(AppError::bad_request(
            "DECODE_FAILED",
            &format!("Could not decode image: {detail}"),
        )),
        Err(DetectError::Unavailable) => {
            Err(AppError::service_unavailable("Landmark detector unavailable"))
        }
    }
}

async fn landmark_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_landmarks(socket, state))
}

async fn handle_landmarks(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let detector = state.detector().clone();
    let mut shutdown = state.shutdown_rx();

    loop {
        let msg = tokio::select! {
            msg = receiver.next() => msg,
            _ = shutdown.recv() => break,
        };
        let reply = match msg {
            Some(Ok(Message::Binary(bytes))) => {
                match run_detector(detector.clone(), Bytes::from(bytes)).await {
                    Ok(reply) => serde_json::to_value(&reply).unwrap_or(Value::Null),
                    Err(e) => {
                        tracing::debug!(error = %e, "Frame rejected");
                        detect_error_reply(&e)
                    }
                }
            }
            Some(Ok(Message::Text(_))) => json!({
                "error": "send_binary_frames",
                "detail": "Send image bytes as binary frames",
            }),
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Landmark socket error");
                break;
            }
        };
        if sender.send(Message::Text(reply.to_string().into())).await.is_err() {
            break;
        }
    }
    let _ = sender.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_carry_detail() {
        let v = detect_error_reply(&DetectError::Decode("bad header".into()));
        assert_eq!(v["error"], "decode_failed");
        assert_eq!(v["detail"], "bad header");
    }

    #[tokio::test]
    async fn unavailable_detector_is_reported() {
        let detector: Arc<dyn LandmarkDetector> =
            Arc::new(crate::pose::detector::UnavailableDetector);
        let err = run_detector(detector, Bytes::from_static(b"\xff\xd8"))
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::Unavailable));
        assert_eq!(detect_error_reply(&err)["error"], "detector_unavailable");
    }
}
