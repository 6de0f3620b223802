//! Access filtering for the HTTP surface.
//!
//! Loopback clients are always allowed; anything else must fall inside the
//! configured trusted-network allowlist. A per-client rate limit caps
//! request bursts. Authentication and session semantics live elsewhere.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use ipnet::IpNet;
use tracing::warn;

use crate::config::Settings;
use crate::errors::ApiError;

use super::AppState;

pub struct AccessGuard {
    trusted: Vec<IpNet>,
    limiter: RateLimiter,
}

impl AccessGuard {
    pub fn from_settings(settings: &Settings) -> Self {
        // Settings::validate guarantees these parse.
        let trusted = settings
            .trusted_networks
            .iter()
            .filter_map(|net| net.parse().ok())
            .collect();
        Self {
            trusted,
            limiter: RateLimiter::new(settings.rate_limit_rps),
        }
    }

    /// Loopback is always trusted; other clients must match the allowlist.
    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        if ip.is_loopback() {
            return true;
        }
        self.trusted.iter().any(|net| net.contains(&ip))
    }

    pub fn check_rate(&self, ip: IpAddr) -> bool {
        self.limiter.allow(ip)
    }

    /// Combined admission check for one request.
    pub fn check(&self, ip: IpAddr) -> Result<(), ApiError> {
        if !self.is_trusted(ip) {
            return Err(ApiError::Forbidden(format!("untrusted network {}", ip)));
        }
        if !self.check_rate(ip) {
            return Err(ApiError::RateLimitExceeded(ip.to_string()));
        }
        Ok(())
    }
}

/// Fixed-window per-client request budget.
struct RateLimiter {
    hits: DashMap<IpAddr, (Instant, u64)>,
    budget: u64,
}

impl RateLimiter {
    fn new(budget: u64) -> Self {
        Self {
            hits: DashMap::new(),
            budget,
        }
    }

    fn allow(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut entry = self.hits.entry(ip).or_insert((now, 0));
        let (window_start, count) = *entry;
        if now.duration_since(window_start).as_secs() >= 1 {
            *entry = (now, 1);
            return true;
        }
        if count >= self.budget {
            return false;
        }
        *entry = (window_start, count + 1);
        true
    }
}

/// Router middleware applying the trusted-network and rate checks.
pub async fn guard_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    match state.guard.check(addr.ip()) {
        Ok(()) => next.run(request).await,
        Err(e @ ApiError::Forbidden(_)) => {
            warn!(target: "netmood::api", "rejected client {}: {}", addr.ip(), e);
            (StatusCode::FORBIDDEN, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::TOO_MANY_REQUESTS, e.to_string()).into_response(),
    }
}
