use std::fmt;

use crate::error::{AuthError, AuthResult};

/// Default access credential lifetime (24 hours).
pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 24 * 60 * 60;
/// Refresh credential lifetime (7 days).
pub const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Signing material and lifetimes for session credentials.
///
/// Built once at startup and shared read-only; access and refresh credentials
/// are signed with distinct secrets so neither validates as the other.
#[derive(Clone)]
pub struct JwtConfig {
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    /// Lifetime of access credentials in seconds.
    pub access_ttl_seconds: i64,
    /// Lifetime of refresh credentials in seconds.
    pub refresh_ttl_seconds: i64,
}

impl JwtConfig {
    /// Construct config with the default lifetimes (24h access, 7d refresh).
    pub fn new(
        access_secret: impl Into<Vec<u8>>,
        refresh_secret: impl Into<Vec<u8>>,
    ) -> AuthResult<Self> {
        let access_secret = access_secret.into();
        let refresh_secret = refresh_secret.into();

        if access_secret.is_empty() || refresh_secret.is_empty() {
            return Err(AuthError::Config("signing secrets must not be empty"));
        }
        if access_secret == refresh_secret {
            return Err(AuthError::Config(
                "access and refresh secrets must differ",
            ));
        }

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
        })
    }

    pub(crate) fn access_secret(&self) -> &[u8] {
        &self.access_secret
    }

    pub(crate) fn refresh_secret(&self) -> &[u8] {
        &self.refresh_secret
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}
