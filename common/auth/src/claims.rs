use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::Role;

/// Claims whose validity window ends at a Unix timestamp.
pub trait ExpiringClaims {
    fn expires_at(&self) -> i64;
}

/// Claims carried by an access credential. `jti` keeps two credentials minted
/// in the same second distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub email: String,
    pub external_address: String,
    pub role: String,
    pub exp: i64,
}

impl AccessClaims {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

impl ExpiringClaims for AccessClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Claims carried by a refresh credential. `bound_access` is the exact access
/// credential string minted alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub email: String,
    pub bound_access: String,
    pub exp: i64,
}

impl ExpiringClaims for RefreshClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}
