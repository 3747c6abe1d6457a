use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct PortalMetrics {
    registry: Registry,
    signin_attempts: IntCounterVec,
    refreshes: IntCounterVec,
    redemption_upserts: IntCounterVec,
    rate_limited: IntCounter,
}

impl PortalMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let signin_attempts = IntCounterVec::new(
            Opts::new(
                "portal_signin_attempts_total",
                "Count of sign-in attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(signin_attempts.clone()))?;

        let refreshes = IntCounterVec::new(
            Opts::new(
                "portal_refresh_total",
                "Count of refresh rotations grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(refreshes.clone()))?;

        let redemption_upserts = IntCounterVec::new(
            Opts::new(
                "portal_redemption_upserts_total",
                "Count of redemption upserts grouped by intake channel and outcome",
            ),
            &["channel", "outcome"],
        )?;
        registry.register(Box::new(redemption_upserts.clone()))?;

        let rate_limited = IntCounter::new(
            "portal_rate_limited_total",
            "Count of requests rejected by the per-client rate limit",
        )?;
        registry.register(Box::new(rate_limited.clone()))?;

        Ok(Self {
            registry,
            signin_attempts,
            refreshes,
            redemption_upserts,
            rate_limited,
        })
    }

    pub fn signin_attempt(&self, outcome: &str) {
        self.signin_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn refresh(&self, outcome: &str) {
        self.refreshes.with_label_values(&[outcome]).inc();
    }

    pub fn redemption_upsert(&self, channel: &str, outcome: &str) {
        self.redemption_upserts
            .with_label_values(&[channel, outcome])
            .inc();
    }

    pub fn rate_limited(&self) {
        self.rate_limited.inc();
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
