use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use preview_core::job::JobKey;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::error::AppResult;
use crate::state::AppState;
use crate::ws::feed::{self, FeedFilter};

/// Interval between heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Follow a single job instead of every job.
    pub key: Option<String>,
}

/// GET /api/v1/ws?key= -- upgrade to a live progress feed.
///
/// With a `key`, the feed starts with a snapshot of that job (when known) and
/// closes after the job's final event.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    let filter = match query.key.as_deref() {
        Some(raw) => FeedFilter::job(JobKey::parse(raw)?),
        None => FeedFilter::all(),
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, filter)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// A sender task forwards bus events and heartbeat pings to the sink while
/// the current task drains inbound frames. Either side ending, or server
/// shutdown, ends both.
async fn handle_socket(socket: WebSocket, state: AppState, filter: FeedFilter) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        conn_id = %conn_id,
        job_key = ?filter.key().map(JobKey::as_str),
        "WebSocket connected",
    );

    // Subscribe before taking the snapshot so no event falls in between.
    let mut events = state.event_bus().subscribe();
    let snapshot = filter.key().and_then(|key| state.engine.status(key));
    let follows_one_job = filter.key().is_some();

    let cancel = state.shutdown.child_token();
    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let sender_cancel = cancel.clone();
    let mut send_task = tokio::spawn(async move {
        if let Some(job) = &snapshot {
            if let Some(msg) = feed::snapshot_message(job) {
                if sink.send(msg).await.is_err() {
                    return;
                }
            }
            if job.is_terminal() {
                let _ = sink.send(Message::Close(None)).await;
                return;
            }
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            let (msg, last) = tokio::select! {
                _ = sender_cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                _ = heartbeat.tick() => (Message::Ping(Bytes::new()), false),
                received = events.recv() => match received {
                    Ok(event) if filter.accepts(&event) => {
                        let Some(msg) = feed::event_message(&event) else { continue };
                        (msg, follows_one_job && event.is_final())
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(conn_id = %sender_conn_id, skipped, "WebSocket feed lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                },
            };

            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if last {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    });

    let sender_finished = loop {
        tokio::select! {
            _ = &mut send_task => break true,
            _ = cancel.cancelled() => break false,
            next = stream.next() => match next {
                Some(Ok(Message::Close(_))) | None => break false,
                Some(Ok(Message::Pong(_))) => {
                    tracing::trace!(conn_id = %conn_id, "Pong received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break false;
                }
            },
        }
    };

    cancel.cancel();
    if !sender_finished {
        let _ = send_task.await;
    }
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
