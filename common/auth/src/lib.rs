pub mod claims;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod roles;
pub mod signer;
pub mod verifier;

pub use claims::{AccessClaims, ExpiringClaims, RefreshClaims};
pub use codec::ClaimsCodec;
pub use config::JwtConfig;
pub use error::{AuthError, AuthResult, CodecError};
pub use extractors::{AuthContext, BearerToken};
pub use guards::{authorize, ensure_role};
pub use roles::{Role, KNOWN_ROLES, ROLE_ADMIN, ROLE_EVENT_LOGGER, ROLE_USER};
pub use signer::{IssuedCredential, IssuedTokens, TokenSigner, TokenSubject};
pub use verifier::JwtVerifier;
