//! Prometheus metrics for the capture pipeline.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use prometheus::{opts, Encoder, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics handle shared across the pipeline tasks and the HTTP surface.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    pub observations_total: IntCounter,
    pub drops_total: IntCounter,
    pub snapshots_total: IntCounter,
    pub moods_total: IntCounterVec,

    pub queue_len: IntGauge,
    pub subscribers: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry =
            Registry::new_custom(Some("netmood".to_string()), None).expect("metrics registry");

        let observations_total = IntCounter::with_opts(opts!(
            "observations_total",
            "Observations consumed and classified"
        ))
        .unwrap();
        let drops_total = IntCounter::with_opts(opts!(
            "drops_total",
            "Observations dropped by the bounded queue"
        ))
        .unwrap();
        let snapshots_total = IntCounter::with_opts(opts!(
            "snapshots_total",
            "Window snapshots published"
        ))
        .unwrap();
        let moods_total = IntCounterVec::new(
            opts!("moods_total", "Classified observations per mood label"),
            &["mood"],
        )
        .unwrap();

        let queue_len =
            IntGauge::with_opts(opts!("queue_len", "Current bounded queue length")).unwrap();
        let subscribers =
            IntGauge::with_opts(opts!("subscribers", "Active snapshot subscribers")).unwrap();

        registry
            .register(Box::new(observations_total.clone()))
            .unwrap();
        registry.register(Box::new(drops_total.clone())).unwrap();
        registry
            .register(Box::new(snapshots_total.clone()))
            .unwrap();
        registry.register(Box::new(moods_total.clone())).unwrap();
        registry.register(Box::new(queue_len.clone())).unwrap();
        registry.register(Box::new(subscribers.clone())).unwrap();

        Self {
            registry,
            observations_total,
            drops_total,
            snapshots_total,
            moods_total,
            queue_len,
            subscribers,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics_handler(metrics: Arc<Metrics>) -> impl IntoResponse {
    let metric_families = metrics.registry.gather();
    let mut buf = Vec::with_capacity(4 * 1024);
    let encoder = TextEncoder::new();
    if encoder.encode(&metric_families, &mut buf).is_err() {
        let mut resp = (StatusCode::INTERNAL_SERVER_ERROR, "metrics encode error").into_response();
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        return resp;
    }

    let body = String::from_utf8(buf).unwrap_or_else(|_| String::from("# encoding error\n"));
    let mut resp = (StatusCode::OK, body).into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    resp
}
