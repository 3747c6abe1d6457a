use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const DEFAULT_RATE_LIMIT: u32 = 60;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

// Beyond this many tracked clients, expired windows are swept on write.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub current: u32,
}

#[async_trait]
pub trait RateLimiterEngine: Send + Sync {
    async fn check(&self, key: &str, limit: u32) -> RateDecision;
}

/// Fixed-window counter per key, held in process memory.
pub struct InMemoryRateLimiter {
    windows: Mutex<HashMap<String, (u32, Instant)>>,
    window: Duration,
}

impl InMemoryRateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
        }
    }
}

#[async_trait]
impl RateLimiterEngine for InMemoryRateLimiter {
    async fn check(&self, key: &str, limit: u32) -> RateDecision {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        if windows.len() > SWEEP_THRESHOLD {
            let window = self.window;
            windows.retain(|_, (_, started)| now.duration_since(*started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) >= self.window {
            *entry = (0, now);
        }
        entry.0 = entry.0.saturating_add(1);
        RateDecision {
            allowed: entry.0 <= limit,
            current: entry.0,
        }
    }
}

/// Loopback callers are never limited.
pub fn limiter_key(peer: IpAddr) -> Option<String> {
    if peer.is_loopback() {
        None
    } else {
        Some(peer.to_string())
    }
}

/// Per-client-IP request limit. Requests without a known peer address pass.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .and_then(|info| limiter_key(info.0.ip()));

    if let Some(key) = key {
        let decision = state.rate_limiter.check(&key, state.rate_limit).await;
        if !decision.allowed {
            warn!(client = %key, count = decision.current, limit = state.rate_limit, "rate limit exceeded");
            state.metrics.rate_limited();
            return Err(ApiError::RateLimited);
        }
    }

    Ok(next.run(request).await)
}
