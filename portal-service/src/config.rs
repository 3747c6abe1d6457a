use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use common_auth::JwtConfig;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STORE_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 60;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

const DEFAULT_ALLOW_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt: JwtConfig,
    pub store_timeout: Duration,
    pub allow_origins: Vec<String>,
    pub db_max_connections: u32,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    load_from(|key| env::var(key).ok())
}

/// Builds the configuration from an arbitrary key lookup.
pub fn load_from<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let database_url = lookup("DATABASE_URL")
        .and_then(|value| normalize_optional(&value))
        .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

    let host = lookup("HOST")
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Failed to parse HOST '{host}'"))?;
    let port = parse_number(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);

    let access_secret = lookup("APP_SECRET_KEY").unwrap_or_default();
    let refresh_secret = lookup("APP_REFRESH_SECRET_KEY").unwrap_or_default();
    let jwt = JwtConfig::new(access_secret, refresh_secret)
        .context("Invalid APP_SECRET_KEY / APP_REFRESH_SECRET_KEY")?;

    let store_timeout_seconds =
        parse_number(&lookup, "STORE_TIMEOUT_SECONDS")?.unwrap_or(DEFAULT_STORE_TIMEOUT_SECONDS);
    if store_timeout_seconds == 0 {
        return Err(anyhow!("STORE_TIMEOUT_SECONDS must be positive"));
    }

    let allow_origins = lookup("ALLOW_ORIGIN")
        .map(|value| parse_list(&value))
        .filter(|origins| !origins.is_empty())
        .unwrap_or_else(|| {
            DEFAULT_ALLOW_ORIGINS
                .iter()
                .map(|origin| origin.to_string())
                .collect()
        });

    let db_max_connections =
        parse_number(&lookup, "DB_MAX_CONNECTIONS")?.unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

    let rate_limit_max =
        parse_number(&lookup, "RATE_LIMIT_MAX")?.unwrap_or(DEFAULT_RATE_LIMIT_MAX);
    let rate_limit_window_seconds = parse_number(&lookup, "RATE_LIMIT_WINDOW_SECONDS")?
        .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECONDS);
    if rate_limit_max == 0 || rate_limit_window_seconds == 0 {
        return Err(anyhow!(
            "RATE_LIMIT_MAX and RATE_LIMIT_WINDOW_SECONDS must be positive"
        ));
    }

    Ok(ServiceConfig {
        database_url,
        bind_addr: SocketAddr::from((ip, port)),
        jwt,
        store_timeout: Duration::from_secs(store_timeout_seconds),
        allow_origins,
        db_max_connections,
        rate_limit_max,
        rate_limit_window: Duration::from_secs(rate_limit_window_seconds),
    })
}

fn parse_number<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .and_then(|value| normalize_optional(&value))
        .map(|value| value.parse::<T>())
        .transpose()
        .with_context(|| format!("Failed to parse {key}"))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
