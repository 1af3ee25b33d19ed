use axum::{extract::State, Json};
use serde::Serialize;

use super::UserId;
use crate::auth::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub online_users: Vec<UserId>,
}

/// GET /api/presence: current online set. JWT auth required.
pub async fn get_presence(State(state): State<AppState>, _claims: Claims) -> Json<PresenceResponse> {
    Json(PresenceResponse {
        online_users: state.registry.snapshot_online_ids(),
    })
}
