//! Integration tests for WebSocket presence and live message delivery.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use chat_server::chat::store::SqliteMessageStore;
use chat_server::routes::RouterOptions;
use chat_server::state::AppState;
use chat_server::ws::protocol::ServerEvent;
use chat_server::ws::Keepalive;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestServer {
    base_url: String,
    addr: SocketAddr,
    jwt_secret: Vec<u8>,
}

impl TestServer {
    fn token(&self, user_id: &str) -> String {
        chat_server::auth::jwt::issue_access_token(&self.jwt_secret, user_id).unwrap()
    }
}

/// Helper: start the server on a random port.
async fn start_test_server() -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = chat_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = chat_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let store = Arc::new(SqliteMessageStore::new(db));
    let state = AppState::new(store, jwt_secret.clone(), Keepalive::default());

    let app = chat_server::routes::build_router(state, &RouterOptions::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        // Keep tmp_dir alive so the data directory isn't deleted
        let _keep = tmp_dir;
    });

    TestServer {
        base_url: format!("http://{}", addr),
        addr,
        jwt_secret,
    }
}

async fn connect(server: &TestServer, user_id: Option<&str>) -> WsStream {
    let url = match user_id {
        Some(user_id) => format!("ws://{}/ws?token={}", server.addr, server.token(user_id)),
        None => format!("ws://{}/ws", server.addr),
    };
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("WebSocket connect failed");
    ws_stream
}

/// Wait for the next event frame, skipping control frames.
async fn next_event(ws: &mut WsStream) -> ServerEvent {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(3), ws.next())
            .await
            .expect("Timed out waiting for event")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = frame {
            return ServerEvent::from_json(text.as_str()).expect("Invalid event frame");
        }
    }
}

async fn next_online_set(ws: &mut WsStream) -> Vec<String> {
    match next_event(ws).await {
        ServerEvent::OnlineUsers(ids) => ids,
        other => panic!("Expected getOnlineUsers, got {:?}", other),
    }
}

async fn assert_no_event(ws: &mut WsStream) {
    if let Ok(Some(Ok(Message::Text(text)))) =
        tokio::time::timeout(Duration::from_millis(300), ws.next()).await
    {
        panic!("Unexpected event: {}", text.as_str());
    }
}

async fn disconnect(mut ws: WsStream) {
    let _ = ws.send(Message::Close(None)).await;
    // Wait for the server to finish the close handshake
    let _ = tokio::time::timeout(Duration::from_secs(1), async {
        while let Some(Ok(_)) = ws.next().await {}
    })
    .await;
}

async fn send_message(server: &TestServer, from: &str, to: &str, text: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/messages/send/{}", server.base_url, to))
        .bearer_auth(server.token(from))
        .json(&json!({ "text": text }))
        .send()
        .await
        .unwrap()
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_connect_broadcasts_self() {
    let server = start_test_server().await;
    let mut alice = connect(&server, Some("alice")).await;

    assert_eq!(next_online_set(&mut alice).await, ids(&["alice"]));
}

#[tokio::test]
async fn test_second_connect_broadcasts_both() {
    let server = start_test_server().await;
    let mut alice = connect(&server, Some("alice")).await;
    assert_eq!(next_online_set(&mut alice).await, ids(&["alice"]));

    let mut bob = connect(&server, Some("bob")).await;

    assert_eq!(next_online_set(&mut alice).await, ids(&["alice", "bob"]));
    assert_eq!(next_online_set(&mut bob).await, ids(&["alice", "bob"]));
}

#[tokio::test]
async fn test_message_pushed_to_online_recipient_only() {
    let server = start_test_server().await;
    let mut alice = connect(&server, Some("alice")).await;
    next_online_set(&mut alice).await;
    let mut bob = connect(&server, Some("bob")).await;
    next_online_set(&mut alice).await;
    next_online_set(&mut bob).await;

    let resp = send_message(&server, "bob", "alice", "hi alice").await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    match next_event(&mut alice).await {
        ServerEvent::NewMessage(message) => {
            assert_eq!(message.sender_id, "bob");
            assert_eq!(message.recipient_id, "alice");
            assert_eq!(message.text.as_deref(), Some("hi alice"));
            assert_eq!(body["message"]["id"], message.id.as_str());
        }
        other => panic!("Expected newMessage, got {:?}", other),
    }
    assert_no_event(&mut bob).await;
}

#[tokio::test]
async fn test_message_to_offline_user_still_succeeds() {
    let server = start_test_server().await;
    let mut bob = connect(&server, Some("bob")).await;
    next_online_set(&mut bob).await;

    let resp = send_message(&server, "bob", "carol", "see you later").await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"]["recipientId"], "carol");

    assert_no_event(&mut bob).await;

    // Carol reads it from history later
    let history: serde_json::Value = reqwest::Client::new()
        .get(format!("{}/api/messages/bob", server.base_url))
        .bearer_auth(server.token("carol"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_disconnect_broadcasts_removal() {
    let server = start_test_server().await;
    let mut watcher = connect(&server, None).await;
    assert_eq!(next_online_set(&mut watcher).await, Vec::<String>::new());

    let alice = connect(&server, Some("alice")).await;
    assert_eq!(next_online_set(&mut watcher).await, ids(&["alice"]));

    disconnect(alice).await;
    assert_eq!(next_online_set(&mut watcher).await, Vec::<String>::new());
}

#[tokio::test]
async fn test_stale_disconnect_keeps_user_online() {
    let server = start_test_server().await;
    let mut first_tab = connect(&server, Some("alice")).await;
    next_online_set(&mut first_tab).await;
    let mut second_tab = connect(&server, Some("alice")).await;
    assert_eq!(next_online_set(&mut second_tab).await, ids(&["alice"]));

    disconnect(first_tab).await;

    assert_eq!(next_online_set(&mut second_tab).await, ids(&["alice"]));

    let presence: serde_json::Value = reqwest::Client::new()
        .get(format!("{}/api/presence", server.base_url))
        .bearer_auth(server.token("bob"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(presence["onlineUsers"], json!(["alice"]));

    // Live messages reach the newest tab
    send_message(&server, "bob", "alice", "new tab?").await;
    assert!(matches!(next_event(&mut second_tab).await, ServerEvent::NewMessage(_)));
}

#[tokio::test]
async fn test_anonymous_and_invalid_token_sessions_are_not_registered() {
    let server = start_test_server().await;
    let mut alice = connect(&server, Some("alice")).await;
    next_online_set(&mut alice).await;

    let mut anonymous = connect(&server, None).await;
    assert_eq!(next_online_set(&mut anonymous).await, ids(&["alice"]));

    let url = format!("ws://{}/ws?token=not-a-jwt", server.addr);
    let (mut forged, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    assert_eq!(next_online_set(&mut forged).await, ids(&["alice"]));

    // Neither join was announced to alice
    assert_no_event(&mut alice).await;

    // Both still hear about real presence changes
    let _bob = connect(&server, Some("bob")).await;
    assert_eq!(next_online_set(&mut anonymous).await, ids(&["alice", "bob"]));
    assert_eq!(next_online_set(&mut forged).await, ids(&["alice", "bob"]));
}
