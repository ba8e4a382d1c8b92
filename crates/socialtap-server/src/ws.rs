//! WebSocket transport.
//!
//! Clients send `{type: "get-scraping", payload}`; every message is handled
//! on its own task and answered with `scraping-completed` or
//! `scraping-error`. Rate-limited messages get `{type: "error"}`. Closing
//! the socket cancels the connection's in-flight calls.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{client_ip, AppState};
use crate::stats::StatEvent;
use crate::validate::{validate, ScrapeRequest};

pub const GET_SCRAPING: &str = "get-scraping";

#[derive(Debug, Deserialize)]
struct Incoming {
    #[serde(rename = "type")]
    kind: Option<String>,
    payload: Option<Value>,
}

pub async fn handle_upgrade(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let ip = client_ip(connect);
    upgrade.on_upgrade(move |socket| run_connection(state, socket, ip))
}

async fn run_connection(state: Arc<AppState>, socket: WebSocket, ip: IpAddr) {
    let connection = Uuid::new_v4();
    let span = info_span!("ws", %connection, %ip);
    async move {
        info!("client connected");
        let (mut sink, mut stream) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let cancel = state.shutdown.child_token();

        let writer = tokio::spawn(async move {
            while let Some(reply) = rx.recv().await {
                if sink.send(Message::Text(reply.to_string())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(message) = stream.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("socket read failed: {e}");
                    break;
                }
            };
            state.stats.record(StatEvent::WebSocketRequest).await;
            let task = Uuid::new_v4();
            tokio::spawn(
                handle_message(state.clone(), ip, text, tx.clone(), cancel.child_token())
                    .instrument(info_span!("task", %task)),
            );
        }

        cancel.cancel();
        drop(tx);
        let _ = writer.await;
        info!("client disconnected");
    }
    .instrument(span)
    .await
}

/// Handle one text frame and queue exactly one reply.
pub async fn handle_message(
    state: Arc<AppState>,
    ip: IpAddr,
    text: String,
    replies: mpsc::UnboundedSender<Value>,
    cancel: CancellationToken,
) {
    let reply = process(&state, ip, &text, cancel).await;
    let event = if reply["type"] == "scraping-completed" {
        StatEvent::Success
    } else {
        StatEvent::Error
    };
    state.stats.record(event).await;
    if replies.send(reply).is_err() {
        debug!("connection closed before the reply was sent");
    }
}

async fn process(state: &AppState, ip: IpAddr, text: &str, cancel: CancellationToken) -> Value {
    let incoming: Incoming = match serde_json::from_str(text) {
        Ok(incoming) => incoming,
        Err(e) => return scraping_error(&ApiError::Validation(format!("Invalid message: {e}")), Value::Null),
    };
    let payload = match (incoming.kind.as_deref(), incoming.payload) {
        (Some(GET_SCRAPING), Some(payload)) => payload,
        (_, payload) => {
            return scraping_error(
                &ApiError::Validation("Invalid message type or missing payload".into()),
                payload.unwrap_or(Value::Null),
            )
        }
    };

    if !state.limiter.check(ip).await {
        warn!("rate limit exceeded");
        return json!({ "type": "error", "payload": ApiError::RateLimited.envelope() });
    }

    let raw: ScrapeRequest = match serde_json::from_value(payload.clone()) {
        Ok(raw) => raw,
        Err(e) => return scraping_error(&ApiError::Validation(format!("Invalid payload: {e}")), payload),
    };
    let request = match validate(&raw) {
        Ok(request) => request,
        Err(e) => return scraping_error(&e, payload),
    };

    info!(platform = %request.platform, action = %request.action, url = %request.url, "scrape requested");
    match state.backend.scrape(&request, cancel).await {
        Ok(data) => json!({
            "type": "scraping-completed",
            "payload": { "success": true, "data": data, "taskData": request },
        }),
        Err(e) => {
            info!(code = e.code(), "scrape failed: {e}");
            scraping_error(&ApiError::from(e), payload)
        }
    }
}

fn scraping_error(error: &ApiError, task_data: Value) -> Value {
    let mut payload = error.envelope();
    payload["taskData"] = task_data;
    json!({ "type": "scraping-error", "payload": payload })
}
