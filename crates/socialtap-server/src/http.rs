//! HTTP front end: `POST /scrape`, `GET /ws`, `GET /health`, `GET /stats`.
//!
//! `/scrape` and `/ws` sit behind the bearer-token layer when a token is
//! configured; `/health` and `/stats` never do.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, info_span, Instrument};

use crate::backend::ScrapeBackend;
use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::rate_limit::RateLimiter;
use crate::stats::{StatEvent, StatsStore};
use crate::validate::{validate, ScrapeRequest};
use crate::ws;

/// Shared state handed to every handler.
pub struct AppState {
    pub backend: Arc<dyn ScrapeBackend>,
    pub limiter: RateLimiter,
    pub stats: StatsStore,
    pub token: Option<String>,
    /// Cancelled on shutdown; every call runs under a child token.
    pub shutdown: CancellationToken,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl AppState {
    pub fn new(backend: Arc<dyn ScrapeBackend>, limiter: RateLimiter, stats: StatsStore) -> Self {
        Self {
            backend,
            limiter,
            stats,
            token: None,
            shutdown: CancellationToken::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/scrape", post(handle_scrape))
        .route("/ws", get(ws::handle_upgrade))
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .route("/health", get(handle_health))
        .route("/stats", get(handle_stats))
        .layer(cors)
        .with_state(state)
}

/// Bind `config.listen` and serve until `state.shutdown` fires.
pub async fn serve(config: &ServerConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!("socialtap server listening on http://{}", config.listen);

    let shutdown = state.shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
}

/// Client address; unspecified when the server runs without connect info.
pub fn client_ip(info: Option<ConnectInfo<SocketAddr>>) -> IpAddr {
    info.map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

async fn auth_layer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    if let Some(expected) = &state.token {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected);
        if !authorized {
            return ApiError::Unauthorized.into_response();
        }
    }
    next.run(request).await
}

async fn handle_scrape(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    state.stats.record(StatEvent::PostRequest).await;
    let result = scrape(&state, client_ip(connect), body).await;
    state
        .stats
        .record(if result.is_ok() {
            StatEvent::Success
        } else {
            StatEvent::Error
        })
        .await;
    result.map(|data| Json(json!({ "success": true, "data": data })))
}

async fn scrape(
    state: &AppState,
    ip: IpAddr,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> ApiResult<Value> {
    if !state.limiter.check(ip).await {
        return Err(ApiError::RateLimited);
    }
    let Json(raw) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let request = validate(&raw)?;

    let span = info_span!("http_scrape", %ip, platform = %request.platform, action = %request.action);
    async {
        info!(url = %request.url, "scrape requested");
        let output = state
            .backend
            .scrape(&request, state.shutdown.child_token())
            .await?;
        serde_json::to_value(output).map_err(|e| ApiError::Internal(e.to_string()))
    }
    .instrument(span)
    .await
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut health = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": state.uptime_secs(),
    });
    if let Some((available, capacity)) = state.backend.pool_status() {
        health["pool"] = json!({ "available": available, "capacity": capacity });
    }
    Json(health)
}

async fn handle_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.stats.snapshot().await))
}
