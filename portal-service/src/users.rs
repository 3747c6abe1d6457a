use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use common_auth::{Role, TokenSubject, KNOWN_ROLES};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;

/// Stored identity. `refresh_token` holds the single outstanding refresh
/// credential, if any.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub external_address: String,
    pub address: String,
    pub tel: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
}

impl UserRecord {
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            user_id: self.id,
            email: self.email.clone(),
            external_address: self.external_address.clone(),
            role: self.role.clone(),
        }
    }

    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    pub fn view(&self) -> UserView {
        UserView::from(self)
    }
}

/// Public projection of a user; never carries the password hash or the
/// refresh credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub external_address: String,
    pub address: String,
    pub tel: String,
}

impl From<&UserRecord> for UserView {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            external_address: user.external_address.clone(),
            address: user.address.clone(),
            tel: user.tel.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub external_address: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub tel: String,
}

impl NewUser {
    /// Validates the request and hashes the password.
    pub fn into_record(self) -> Result<UserRecord, ApiError> {
        let email = self.email.trim().to_string();
        if email.is_empty() {
            return Err(ApiError::BadRequest("Email must not be empty".to_string()));
        }
        validate_role(&self.role)?;
        let password_hash = hash_password(&self.password)?;

        Ok(UserRecord {
            id: Uuid::new_v4(),
            name: self.name,
            email,
            role: self.role,
            external_address: self.external_address,
            address: self.address,
            tel: self.tel,
            password_hash,
            refresh_token: None,
        })
    }
}

fn validate_role(role: &str) -> Result<(), ApiError> {
    if Role::parse(role).is_known() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Unsupported role '{role}'. Allowed roles: {}",
            KNOWN_ROLES.join(", ")
        )))
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    if password.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Password must not be empty".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Internal(format!("Failed to hash password: {err}")))
}

/// One-way comparison; an unparseable stored hash never matches.
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
