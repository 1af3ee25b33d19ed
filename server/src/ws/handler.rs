use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::auth::jwt;
use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for WebSocket connection.
#[derive(Debug, Deserialize)]
pub struct WsConnectQuery {
    /// Access token identifying the user. Optional.
    pub token: Option<String>,
}

/// GET /ws?token=JWT
/// WebSocket upgrade endpoint.
///
/// A valid token binds the session to the token's user. A missing or invalid
/// token still gets a session, but one that is never registered as online.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsConnectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = match params.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => match jwt::validate_access_token(&state.jwt_secret, token) {
            Ok(claims) => {
                tracing::info!(user_id = %claims.sub, "WebSocket connection authenticated");
                Some(claims.sub)
            }
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket token rejected, session will not be registered");
                None
            }
        },
        None => {
            tracing::debug!("WebSocket connection without token");
            None
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Option<String>) {
    actor::run_connection(socket, state, user_id).await;
}
