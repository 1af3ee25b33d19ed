use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, timeout};

use crate::state::AppState;
use crate::ws::protocol;

/// Run the actor-per-connection pattern for one WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Ping task: pings on an interval and ends the session on pong timeout
/// - Reader loop: watches for pongs, close frames and stream end
///
/// The session is opened with the lifecycle manager before any traffic and
/// closed exactly once when the reader loop exits, whatever the cause.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: Option<String>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Spawn writer first so the initial presence frame is flushed promptly
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    let session = state.lifecycle.open(user_id.as_deref(), tx.clone());

    tracing::info!(
        user_id = user_id.as_deref().unwrap_or("-"),
        session = %session,
        "WebSocket actor started"
    );

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();
    // Fires (or drops) when the ping task gives up on the connection
    let (expired_tx, mut expired_rx) = oneshot::channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let keepalive = state.keepalive;
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(keepalive.ping_interval);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died, connection is gone
                break;
            }

            match timeout(keepalive.pong_timeout, pong_rx.recv()).await {
                Ok(Some(())) => {}
                _ => {
                    tracing::warn!(session = %session, "Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    let _ = expired_tx.send(());
                    break;
                }
            }
        }
    });

    loop {
        let next = tokio::select! {
            next = ws_receiver.next() => next,
            _ = &mut expired_rx => {
                tracing::info!(session = %session, "Keepalive expired");
                break;
            }
        };

        match next {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_message(text.as_str(), user_id.as_deref());
                }
                Message::Binary(data) => {
                    tracing::debug!(session = %session, bytes = data.len(), "Ignoring binary frame");
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(session = %session, reason = ?frame, "Client initiated close");
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(session = %session, error = %e, "WebSocket receive error");
                break;
            }
            None => {
                tracing::info!(session = %session, "WebSocket stream ended");
                break;
            }
        }
    }

    ping_handle.abort();
    writer_handle.abort();

    state.lifecycle.close(session);

    tracing::info!(
        user_id = user_id.as_deref().unwrap_or("-"),
        session = %session,
        "WebSocket actor stopped"
    );
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if ws_sender.send(msg).await.is_err() || closing {
            break;
        }
    }
}
