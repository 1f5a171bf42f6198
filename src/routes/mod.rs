pub mod control;
pub mod health;
pub mod identity;
pub mod landmarks;
pub mod leaderboard;
pub mod play;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};

use crate::middleware::request_id;
use crate::response::ErrorBody;
use crate::state::AppState;

/// Maximum request body size: 4 MiB (camera frames on `/api/pose`).
const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(leaderboard::router())
        .merge(identity::router())
        .merge(landmarks::api_router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    let ws_routes = Router::new()
        .merge(control::router())
        .merge(play::router())
        .merge(landmarks::ws_router());

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .nest("/ws", ws_routes)
        .fallback(fallback_404)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}

async fn fallback_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            code: "NOT_FOUND".to_string(),
            message: "Not found".to_string(),
            trace_id: None,
        }),
    )
}
