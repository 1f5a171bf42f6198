use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::extractors::JsonBody;
use crate::response::{created, AppError};
use crate::state::AppState;
use crate::validation::validate_client_key;

pub fn router() -> Router<AppState> {
    Router::new().route("/identity", post(issue_identity))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRequest {
    #[serde(default)]
    pub client_key: Option<String>,
}

/// Issues a fresh anonymous player id. Reusing a `clientKey` revokes the id
/// previously issued for it.
async fn issue_identity(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<IdentityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client_key = req.client_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
    if let Some(key) = client_key {
        validate_client_key(key).map_err(|msg| AppError::bad_request("INVALID_CLIENT_KEY", msg))?;
    }

    let identity = state.store().create_anonymous_identity(client_key)?;
    tracing::info!(identity_id = %identity.id, "Anonymous identity issued");
    Ok(created(identity))
}
