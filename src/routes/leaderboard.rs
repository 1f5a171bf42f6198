use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::extractors::QueryParams;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/leaderboard", get(top_players))
        .route("/players/:id", get(get_player))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

async fn top_players(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<LeaderboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = state.config().leaderboard.clamp_limit(query.limit);
    let entries = state.store().leaderboard(limit)?;
    Ok(ok(entries))
}

async fn get_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let player = state
        .store()
        .get_player(&id)?
        .ok_or_else(|| AppError::not_found("Player not found"))?;
    Ok(ok(player))
}
