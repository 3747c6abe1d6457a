#![allow(dead_code)]

use std::{env, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common_auth::JwtConfig;
use http_body_util::BodyExt;
use portal_service::metrics::PortalMetrics;
use portal_service::store::{InMemoryStore, UserStore};
use portal_service::users::NewUser;
use portal_service::{router, AppState};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "CorrectHorseBatteryStaple!";

pub fn jwt_config() -> JwtConfig {
    JwtConfig::new("integration-access-secret", "integration-refresh-secret")
        .expect("jwt config")
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(|state| state)
    }

    pub fn with_rate_limit(limit: u32) -> Self {
        Self::build(|state| state.with_rate_limit(limit, Duration::from_secs(60)))
    }

    fn build(configure: impl FnOnce(AppState) -> AppState) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let metrics = Arc::new(PortalMetrics::new().expect("metrics"));
        let state = AppState::new(
            &jwt_config(),
            store.clone(),
            store.clone(),
            metrics,
            Duration::from_secs(5),
        );
        Self {
            app: router(configure(state)),
            store,
        }
    }

    pub async fn seed_user(&self, email: &str, role: &str) -> Uuid {
        let record = NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            role: role.to_string(),
            external_address: "0x00000000000000000000000000000000000000aa".to_string(),
            address: String::new(),
            tel: String::new(),
        }
        .into_record()
        .expect("user record");
        let id = record.id;
        UserStore::insert(self.store.as_ref(), &record)
            .await
            .expect("seed user");
        id
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    /// Signs in through the given route and returns `(access, refresh)`.
    pub async fn sign_in(&self, route: &str, email: &str) -> (String, String) {
        let (status, body) = self.send(form_post(route, email, TEST_PASSWORD)).await;
        assert_eq!(status, StatusCode::OK, "sign in failed: {body}");
        (
            body["token"]["token"].as_str().expect("access").to_string(),
            body["refresh"]["token"].as_str().expect("refresh").to_string(),
        )
    }
}

pub fn form_post(uri: &str, email: &str, password: &str) -> Request<Body> {
    let form = format!(
        "email={}&password={}",
        encode_form(email),
        encode_form(password)
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .expect("request")
}

pub fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn empty_request(method: &str, uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

/// Attaches the peer address the server would record for a TCP client.
pub fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().expect("socket addr");
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn encode_form(value: &str) -> String {
    value
        .bytes()
        .map(|byte| match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (byte as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect()
}

pub struct TestDatabase {
    pool: PgPool,
}

impl TestDatabase {
    pub async fn setup() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("PORTAL_TEST_DATABASE_URL") else {
            eprintln!(
                "Skipping portal-service Postgres tests: set PORTAL_TEST_DATABASE_URL to run them.",
            );
            return Ok(None);
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;
        run_migrations(&pool).await?;

        Ok(Some(Self { pool }))
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrations_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    let mut entries = std::fs::read_dir(&migrations_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();

    for path in entries {
        let sql = std::fs::read_to_string(&path)?;
        for statement in sql.split(';') {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                continue;
            }
            sqlx::query(trimmed).execute(pool).await?;
        }
    }

    Ok(())
}
