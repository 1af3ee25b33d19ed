use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::auth::middleware::JwtSecret;
use crate::chat::messages;
use crate::presence::routes as presence_routes;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// HTTP-layer settings that sit outside the shared state.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Browser origins allowed to call the API with credentials
    pub allowed_origins: Vec<String>,
    /// Request body cap in bytes (image messages travel inline)
    pub max_body_bytes: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    State(state): State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState, options: &RouterOptions) -> Router {
    // Messaging and presence (JWT required, Claims extractor validates token)
    let message_routes = Router::new()
        .route("/api/messages/send/{recipient_id}", post(messages::send_message))
        .route("/api/messages/mark/{message_id}", put(messages::mark_message_seen))
        .route("/api/messages/{user_id}", get(messages::get_conversation))
        .route("/api/presence", get(presence_routes::get_presence));

    // WebSocket endpoint (auth via query param, not JWT header)
    let ws_routes = Router::new().route("/ws", get(ws_handler::ws_upgrade));

    let health = Router::new()
        .route("/health", get(health_check))
        .route("/api/status", get(status));

    Router::new()
        .merge(message_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(cors_layer(&options.allowed_origins))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

async fn status() -> &'static str {
    "server is live"
}
