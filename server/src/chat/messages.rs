//! REST endpoints for sending messages and reading conversation history.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{Message, MessageBody};
use crate::auth::middleware::Claims;
use crate::state::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: Option<String>,
    /// Image URL or data URI
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub message: String,
}

impl FailureResponse {
    fn new(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                success: false,
                message: message.into(),
            }),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub success: bool,
    pub messages: Vec<Message>,
}

// --- Handlers ---

/// POST /api/messages/send/{recipient_id}
/// Store a message and push it live to the recipient if they are online. JWT auth required.
pub async fn send_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(recipient_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<SendMessageResponse>), (StatusCode, Json<FailureResponse>)> {
    let body = MessageBody::new(body.text, body.image).ok_or_else(|| {
        FailureResponse::new(StatusCode::BAD_REQUEST, "Message needs text or an image")
    })?;

    let routed = state
        .router
        .route(&claims.sub, &recipient_id, body)
        .await
        .map_err(|e| FailureResponse::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            success: true,
            message: routed.message,
        }),
    ))
}

/// GET /api/messages/{user_id}
/// Conversation between the caller and `user_id`, oldest first. JWT auth required.
/// Messages the other user sent to the caller are marked as seen.
pub async fn get_conversation(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
) -> Result<Json<ConversationResponse>, StatusCode> {
    state
        .store
        .mark_conversation_seen(&user_id, &claims.sub)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = %claims.sub, error = %e, "Failed to mark conversation seen");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let messages = state
        .store
        .conversation(&claims.sub, &user_id)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = %claims.sub, error = %e, "Failed to load conversation");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ConversationResponse {
        success: true,
        messages,
    }))
}

/// PUT /api/messages/mark/{message_id}
/// Mark one received message as seen. JWT auth required.
pub async fn mark_message_seen(
    State(state): State<AppState>,
    claims: Claims,
    Path(message_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let updated = state
        .store
        .mark_seen(&message_id, &claims.sub)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if updated {
        Ok(StatusCode::OK)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
