use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use common_auth::{JwtConfig, JwtVerifier, TokenSigner};
use tracing::error;

use crate::metrics::PortalMetrics;
use crate::rate_limit::{
    enforce_rate_limit, InMemoryRateLimiter, RateLimiterEngine, DEFAULT_RATE_LIMIT,
    DEFAULT_RATE_WINDOW,
};
use crate::redemption::Reconciler;
use crate::redemption_handlers::{
    get_redemption, list_redemptions, operator_intake, public_intake, update_status,
};
use crate::session::RotationProtocol;
use crate::session_handlers::{
    admin_signin, event_logger_signin, refresh_access_token, signin, signout, verify_token,
};
use crate::store::{RedemptionStore, UserStore};
use crate::user_handlers::{create_admin, get_user, list_users, register_user, reset_password};

#[derive(Clone)]
pub struct AppState {
    pub jwt_verifier: Arc<JwtVerifier>,
    pub sessions: Arc<RotationProtocol>,
    pub reconciler: Arc<Reconciler>,
    pub users: Arc<dyn UserStore>,
    pub metrics: Arc<PortalMetrics>,
    pub store_timeout: Duration,
    pub rate_limiter: Arc<dyn RateLimiterEngine>,
    pub rate_limit: u32,
}

impl AppState {
    /// Wires the protocol objects over the given stores.
    pub fn new(
        jwt: &JwtConfig,
        users: Arc<dyn UserStore>,
        redemptions: Arc<dyn RedemptionStore>,
        metrics: Arc<PortalMetrics>,
        store_timeout: Duration,
    ) -> Self {
        let jwt_verifier = Arc::new(JwtVerifier::new(jwt));
        let sessions = Arc::new(RotationProtocol::new(
            TokenSigner::new(jwt),
            jwt_verifier.clone(),
            users.clone(),
            store_timeout,
        ));
        let reconciler = Arc::new(Reconciler::new(redemptions, store_timeout));

        Self {
            jwt_verifier,
            sessions,
            reconciler,
            users,
            metrics,
            store_timeout,
            rate_limiter: Arc::new(InMemoryRateLimiter::new(DEFAULT_RATE_WINDOW)),
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }

    /// Replaces the default per-client limit of 60 requests a minute.
    pub fn with_rate_limit(mut self, limit: u32, window: Duration) -> Self {
        self.rate_limiter = Arc::new(InMemoryRateLimiter::new(window));
        self.rate_limit = limit;
        self
    }
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_verifier.clone()
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(response) => response,
        Err(err) => {
            error!(?err, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn router(state: AppState) -> Router {
    let authen = Router::new()
        .route("/signin", post(signin))
        .route("/admin-signin", post(admin_signin))
        .route("/event-logger-signin", post(event_logger_signin))
        .route("/refresh-access-token", post(refresh_access_token))
        .route("/signout", post(signout))
        .route("/verify-token", get(verify_token));

    let redeemed = Router::new()
        .route("/", post(public_intake).get(list_redemptions))
        .route("/redeem-event", post(operator_intake))
        .route("/update-status", patch(update_status))
        .route("/:tx_hash", get(get_redemption));

    let user = Router::new()
        .route("/", post(register_user).get(list_users))
        .route("/create-admin", post(create_admin))
        .route("/admin/reset-password", post(reset_password))
        .route("/:id", get(get_user));

    let api = Router::new()
        .nest("/authen", authen)
        .nest("/user", user)
        .nest("/redeemed", redeemed);

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_rate_limit,
        ))
        .with_state(state)
}
