use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::claims::ExpiringClaims;
use crate::error::CodecError;

/// HS256 codec bound to a single secret.
#[derive(Clone)]
pub struct ClaimsCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl ClaimsCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn encode<C: Serialize>(&self, claims: &C) -> Result<String, CodecError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| CodecError::Encoding(err.to_string()))
    }

    /// Verifies the signature, then the expiry, then yields the typed claims.
    ///
    /// `exp` is strict: a credential is valid only while `now < exp`.
    pub fn decode<C>(&self, token: &str) -> Result<C, CodecError>
    where
        C: DeserializeOwned + ExpiringClaims,
    {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        let data = decode::<C>(token, &self.decoding, &validation).map_err(classify)?;

        if data.claims.expires_at() <= Utc::now().timestamp() {
            return Err(CodecError::Expired);
        }
        Ok(data.claims)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> CodecError {
    match err.kind() {
        ErrorKind::InvalidSignature => CodecError::InvalidSignature,
        ErrorKind::ExpiredSignature => CodecError::Expired,
        _ => CodecError::Malformed(err.to_string()),
    }
}
