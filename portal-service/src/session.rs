use std::sync::{Arc, OnceLock};
use std::time::Duration;

use common_auth::{IssuedCredential, JwtVerifier, Role, TokenSigner};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::store::{with_deadline, UserStore};
use crate::users::{hash_password, verify_password, UserRecord, UserView};

/// Successful sign-in or rotation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInData {
    pub user: UserView,
    pub token: IssuedCredential,
    pub refresh: IssuedCredential,
}

/// Sign-in, refresh rotation and sign-out over a single active refresh
/// credential per user.
pub struct RotationProtocol {
    signer: TokenSigner,
    verifier: Arc<JwtVerifier>,
    users: Arc<dyn UserStore>,
    deadline: Duration,
}

impl RotationProtocol {
    pub fn new(
        signer: TokenSigner,
        verifier: Arc<JwtVerifier>,
        users: Arc<dyn UserStore>,
        deadline: Duration,
    ) -> Self {
        Self {
            signer,
            verifier,
            users,
            deadline,
        }
    }

    /// Verifies the password and issues a fresh pair. With `required_role`
    /// set, an identity holding any other role is treated as unknown.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        required_role: Option<Role>,
    ) -> ApiResult<SignInData> {
        let found = with_deadline(self.deadline, self.users.find_by_email(email)).await?;
        let user = authenticate(found, password, required_role.as_ref(), verify_password)?;

        let issued = self.signer.issue_tokens(&user.subject())?;
        let stored = with_deadline(
            self.deadline,
            self.users
                .set_refresh_credential(user.id, Some(&issued.refresh.token)),
        )
        .await?;
        if !stored {
            return Err(ApiError::NotFound("User"));
        }

        info!(user_id = %user.id, role = %user.role, "signed in");
        Ok(SignInData {
            user: user.view(),
            token: issued.access,
            refresh: issued.refresh,
        })
    }

    /// Exchanges `refresh` (bound to `presented_access`) for a new pair. Each
    /// refresh credential can be spent once.
    pub async fn refresh(&self, presented_access: &str, refresh: &str) -> ApiResult<SignInData> {
        let claims = self
            .verifier
            .validate_refresh(refresh)
            .map_err(|_| ApiError::RefreshInvalid)?;

        if claims.bound_access != presented_access {
            warn!(user_id = %claims.sub, "refresh presented with a different access credential");
            return Err(ApiError::RefreshInvalid);
        }

        let user = with_deadline(self.deadline, self.users.find_by_id(claims.sub))
            .await?
            .ok_or(ApiError::RefreshInvalid)?;

        if user.refresh_token.as_deref() != Some(refresh) {
            warn!(user_id = %user.id, "refresh credential is no longer current");
            return Err(ApiError::RefreshInvalid);
        }

        let issued = self.signer.issue_tokens(&user.subject())?;
        let swapped = with_deadline(
            self.deadline,
            self.users
                .swap_refresh_credential(user.id, refresh, &issued.refresh.token),
        )
        .await?;
        if !swapped {
            warn!(user_id = %user.id, "concurrent rotation already spent this refresh credential");
            return Err(ApiError::RefreshInvalid);
        }

        info!(user_id = %user.id, "rotated credentials");
        Ok(SignInData {
            user: user.view(),
            token: issued.access,
            refresh: issued.refresh,
        })
    }

    /// Replaces the password after checking the current one. The stored
    /// refresh credential is dropped in the same write, so sessions opened
    /// with the old password can no longer rotate.
    pub async fn reset_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        if old_password.is_empty() || new_password.is_empty() {
            return Err(ApiError::BadRequest(
                "Passwords must not be empty".to_string(),
            ));
        }

        let user = with_deadline(self.deadline, self.users.find_by_id(user_id))
            .await?
            .ok_or(ApiError::NotFound("User"))?;
        if !verify_password(&user.password_hash, old_password) {
            warn!(%user_id, "password reset with a wrong current password");
            return Err(ApiError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = hash_password(new_password)?;
        let updated = with_deadline(
            self.deadline,
            self.users.replace_password(user_id, &password_hash),
        )
        .await?;
        if !updated {
            return Err(ApiError::NotFound("User"));
        }
        info!(%user_id, "password reset");
        Ok(())
    }

    /// Clears the stored refresh credential. Repeating it is harmless.
    pub async fn sign_out(&self, user_id: Uuid) -> ApiResult<()> {
        let cleared = with_deadline(
            self.deadline,
            self.users.set_refresh_credential(user_id, None),
        )
        .await?;
        if !cleared {
            return Err(ApiError::NotFound("User"));
        }
        info!(%user_id, "signed out");
        Ok(())
    }
}

/// Runs exactly one password verification whatever the outcome, so an
/// unknown email or a role mismatch costs the same as a wrong password.
fn authenticate<V>(
    found: Option<UserRecord>,
    password: &str,
    required_role: Option<&Role>,
    verify: V,
) -> ApiResult<UserRecord>
where
    V: Fn(&str, &str) -> bool,
{
    let stored_hash = found
        .as_ref()
        .map(|user| user.password_hash.as_str())
        .unwrap_or_else(|| placeholder_hash());
    let password_ok = verify(stored_hash, password);

    let user = found.ok_or(ApiError::AuthenticationFailure)?;
    if !password_ok {
        warn!(user_id = %user.id, "password verification failed");
        return Err(ApiError::AuthenticationFailure);
    }
    if let Some(required) = required_role {
        if user.role() != *required {
            warn!(user_id = %user.id, required = %required, "role-scoped sign-in refused");
            return Err(ApiError::AuthenticationFailure);
        }
    }
    Ok(user)
}

/// Argon2 hash with default parameters that no submitted password matches.
fn placeholder_hash() -> &'static str {
    static PLACEHOLDER: OnceLock<String> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        let secret = Uuid::new_v4().to_string();
        hash_password(&secret).unwrap_or_default()
    })
}
