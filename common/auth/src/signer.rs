use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claims::{AccessClaims, RefreshClaims};
use crate::codec::ClaimsCodec;
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

/// Identity fields a credential is minted for.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub external_address: String,
    pub role: String,
}

/// A signed credential and its expiry (Unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCredential {
    pub token: String,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access: IssuedCredential,
    pub refresh: IssuedCredential,
}

/// Mints access credentials with the access secret and refresh credentials
/// with the refresh secret.
#[derive(Clone)]
pub struct TokenSigner {
    access: ClaimsCodec,
    refresh: ClaimsCodec,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenSigner {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access: ClaimsCodec::new(config.access_secret()),
            refresh: ClaimsCodec::new(config.refresh_secret()),
            access_ttl_seconds: config.access_ttl_seconds,
            refresh_ttl_seconds: config.refresh_ttl_seconds,
        }
    }

    /// Signs an access credential. A positive `override_exp` replaces the
    /// default lifetime.
    pub fn issue_access(
        &self,
        subject: &TokenSubject,
        override_exp: Option<i64>,
    ) -> AuthResult<IssuedCredential> {
        let exp = match override_exp {
            Some(exp) if exp > 0 => exp,
            _ => (Utc::now() + Duration::seconds(self.access_ttl_seconds)).timestamp(),
        };

        let claims = AccessClaims {
            sub: subject.user_id,
            jti: Uuid::new_v4(),
            email: subject.email.clone(),
            external_address: subject.external_address.clone(),
            role: subject.role.clone(),
            exp,
        };

        let token = self.access.encode(&claims).map_err(AuthError::Signing)?;
        Ok(IssuedCredential { token, exp })
    }

    pub fn issue_refresh(
        &self,
        subject: &TokenSubject,
        bound_access: &str,
    ) -> AuthResult<IssuedCredential> {
        let exp = (Utc::now() + Duration::seconds(self.refresh_ttl_seconds)).timestamp();
        let claims = RefreshClaims {
            sub: subject.user_id,
            jti: Uuid::new_v4(),
            email: subject.email.clone(),
            bound_access: bound_access.to_string(),
            exp,
        };

        let token = self.refresh.encode(&claims).map_err(AuthError::Signing)?;
        Ok(IssuedCredential { token, exp })
    }

    /// Access credential plus a refresh credential bound to it.
    pub fn issue_tokens(&self, subject: &TokenSubject) -> AuthResult<IssuedTokens> {
        let access = self.issue_access(subject, None)?;
        let refresh = self.issue_refresh(subject, &access.token)?;
        Ok(IssuedTokens { access, refresh })
    }
}
