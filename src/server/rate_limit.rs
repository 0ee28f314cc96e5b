//! Sliding-window rate limiter for the `/api` routes.
//!
//! Requests are counted per client IP (first `x-forwarded-for` entry,
//! `"local"` when absent) over a rolling window; timestamps older than
//! the window are pruned on each hit.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use fiscus_core::config::RateLimitConfig;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

use super::AppState;

/// Shared per-client request log.
#[derive(Clone)]
pub struct Limiter {
    max_requests: usize,
    window: Duration,
    hits: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl Limiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests as usize,
            window: Duration::from_secs(config.window_secs),
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a hit for `key`. Returns false once the window is full.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let log = hits.entry(key.to_string()).or_default();

        while let Some(first) = log.front() {
            if now.duration_since(*first) > self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() >= self.max_requests {
            return false;
        }
        log.push_back(now);
        true
    }
}

pub async fn limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_key(&req);
    if !state.limiter.check(&key).await {
        warn!("rate limit exceeded for {key}");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "too many requests, please try again later"})),
        )
            .into_response();
    }
    next.run(req).await
}

/// Client address: first `x-forwarded-for` entry when proxied, the
/// connection's peer IP otherwise, `"local"` in tests with neither.
fn client_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if let Some(addr) = forwarded {
        return addr;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "local".to_string())
}
