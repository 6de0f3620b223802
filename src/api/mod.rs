//! HTTP/WS surface over the capture controller.
//!
//! Thin transport glue: every handler reads snapshots and stats through the
//! controller's query interface; the WebSocket route is the subscription
//! interface's transport. Access is filtered by the trusted-network guard
//! before any handler runs.

pub mod security;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::config::Settings;
use crate::controller::CaptureController;
use crate::metrics::{self, Metrics};
use crate::privacy;

use security::AccessGuard;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<CaptureController>,
    pub metrics: Arc<Metrics>,
    pub guard: Arc<AccessGuard>,
    /// Field names scrubbed from every outgoing JSON payload.
    pub sensitive_fields: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(
        controller: Arc<CaptureController>,
        metrics: Arc<Metrics>,
        settings: &Settings,
    ) -> Self {
        Self {
            controller,
            metrics,
            guard: Arc::new(AccessGuard::from_settings(settings)),
            sensitive_fields: Arc::new(settings.sensitive_fields.clone()),
        }
    }
}

/// Assemble the router. Everything except /health sits behind the
/// trusted-network and rate-limit guard.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    let guarded = Router::new()
        .route("/stats", get(stats_handler))
        .route("/analysis", get(analysis_handler))
        .route("/export", get(export_handler))
        .route("/metrics", get(prometheus_handler))
        .route("/ws", get(ws::ws_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            security::guard_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(guarded)
        .layer(cors)
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "state": state.controller.state(),
        "source": state.controller.source_kind(),
    }))
}

async fn stats_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = serde_json::to_value(state.controller.stats()).unwrap_or_else(|_| json!({}));
    Json(privacy::redact(stats, &state.sensitive_fields))
}

/// Latest window snapshot, or an explicit absent marker before the first
/// analysis completes. Never a stale error state.
async fn analysis_handler(State(state): State<AppState>) -> Response {
    match state.controller.latest_window() {
        Some(snapshot) => {
            let value = serde_json::to_value(&*snapshot).unwrap_or_else(|_| json!({}));
            Json(privacy::redact(value, &state.sensitive_fields)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "no_analysis", "reason": "insufficient data" })),
        )
            .into_response(),
    }
}

/// Drain the queue's unconsumed observations as CSV.
async fn export_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let mut sink = Vec::new();
    match state.controller.export(&mut sink) {
        Ok(records) => {
            let body = String::from_utf8(sink).unwrap_or_default();
            tracing::debug!(
                target: "netmood::api",
                "exported {} buffered record(s) to {}",
                records,
                addr
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                body,
            )
                .into_response()
        }
        Err(e) => {
            warn!(target: "netmood::api", "export failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "export failed").into_response()
        }
    }
}

async fn prometheus_handler(State(state): State<AppState>) -> Response {
    metrics::metrics_handler(state.metrics.clone())
        .await
        .into_response()
}
