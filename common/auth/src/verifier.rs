use tracing::debug;

use crate::claims::{AccessClaims, RefreshClaims};
use crate::codec::ClaimsCodec;
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

/// Validates access and refresh credentials against their own secrets.
#[derive(Clone)]
pub struct JwtVerifier {
    access: ClaimsCodec,
    refresh: ClaimsCodec,
}

impl JwtVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            access: ClaimsCodec::new(config.access_secret()),
            refresh: ClaimsCodec::new(config.refresh_secret()),
        }
    }

    pub fn validate_access(&self, token: &str) -> AuthResult<AccessClaims> {
        match self.access.decode::<AccessClaims>(token) {
            Ok(claims) => {
                debug!(sub = %claims.sub, "verified access credential");
                Ok(claims)
            }
            Err(reason) => {
                debug!(%reason, "access credential rejected");
                Err(AuthError::TokenInvalid(reason))
            }
        }
    }

    pub fn validate_refresh(&self, token: &str) -> AuthResult<RefreshClaims> {
        match self.refresh.decode::<RefreshClaims>(token) {
            Ok(claims) => {
                debug!(sub = %claims.sub, "verified refresh credential");
                Ok(claims)
            }
            Err(reason) => {
                debug!(%reason, "refresh credential rejected");
                Err(AuthError::TokenInvalid(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::signer::{TokenSigner, TokenSubject};
    use chrono::Utc;
    use uuid::Uuid;

    fn config() -> JwtConfig {
        JwtConfig::new("verifier-access", "verifier-refresh").expect("config")
    }

    fn subject(role: &str) -> TokenSubject {
        TokenSubject {
            user_id: Uuid::new_v4(),
            email: "verify@example.com".to_string(),
            external_address: "0xfeed".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn verifier_accepts_issued_access() {
        let config = config();
        let signer = TokenSigner::new(&config);
        let verifier = JwtVerifier::new(&config);
        let subject = subject("eventLogger");

        let issued = signer.issue_access(&subject, None).expect("issue");
        let claims = verifier.validate_access(&issued.token).expect("valid");

        assert_eq!(claims.sub, subject.user_id);
        assert_eq!(claims.email, subject.email);
        assert_eq!(claims.role, "eventLogger");
        assert_eq!(claims.external_address, "0xfeed");
        assert_eq!(claims.exp, issued.exp);
    }

    #[test]
    fn credentials_are_not_interchangeable() {
        let config = config();
        let signer = TokenSigner::new(&config);
        let verifier = JwtVerifier::new(&config);

        let tokens = signer.issue_tokens(&subject("user")).expect("issue");

        let err = verifier
            .validate_refresh(&tokens.access.token)
            .expect_err("access is not a refresh credential");
        assert_eq!(err.reason(), Some(&CodecError::InvalidSignature));

        let err = verifier
            .validate_access(&tokens.refresh.token)
            .expect_err("refresh is not an access credential");
        assert!(matches!(err, AuthError::TokenInvalid(_)));
    }

    #[test]
    fn expired_access_is_token_invalid() {
        let config = config();
        let signer = TokenSigner::new(&config);
        let verifier = JwtVerifier::new(&config);

        let past = Utc::now().timestamp() - 60;
        let codec = ClaimsCodec::new(b"verifier-access");
        let token = codec
            .encode(&AccessClaims {
                sub: Uuid::new_v4(),
                jti: Uuid::new_v4(),
                email: "late@example.com".to_string(),
                external_address: String::new(),
                role: "user".to_string(),
                exp: past,
            })
            .expect("encode");

        let err = verifier.validate_access(&token).expect_err("expired");
        assert!(matches!(err, AuthError::TokenInvalid(CodecError::Expired)));
        assert_eq!(err.to_string(), "token invalid");

        // Sanity check: the signer still produces valid credentials.
        let fresh = signer.issue_access(&subject("user"), None).expect("issue");
        assert!(verifier.validate_access(&fresh.token).is_ok());
    }
}
