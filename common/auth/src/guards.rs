use tracing::warn;

use crate::claims::AccessClaims;
use crate::error::AuthError;
use crate::roles::Role;
use crate::AuthContext;

/// Strict equality between the claimed role and the required one.
pub fn authorize(claims: &AccessClaims, required: &Role) -> bool {
    claims.role == required.as_str()
}

pub fn ensure_role(auth: &AuthContext, required: Role) -> Result<(), AuthError> {
    if authorize(&auth.claims, &required) {
        return Ok(());
    }

    warn!(
        sub = %auth.claims.sub,
        role = %auth.claims.role,
        required = %required,
        "role_check_failed"
    );
    Err(AuthError::Forbidden {
        required: required.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ctx(role: &str) -> AuthContext {
        AuthContext {
            claims: AccessClaims {
                sub: Uuid::new_v4(),
                jti: Uuid::new_v4(),
                email: "gate@example.com".to_string(),
                external_address: String::new(),
                role: role.to_string(),
                exp: i64::MAX,
            },
            token: "token".to_string(),
        }
    }

    #[test]
    fn user_is_denied_admin() {
        let err = ensure_role(&ctx("user"), Role::Admin).expect_err("denied");
        assert!(matches!(err, AuthError::Forbidden { ref required } if required == "admin"));
    }

    #[test]
    fn admin_does_not_imply_event_logger() {
        assert!(ensure_role(&ctx("admin"), Role::EventLogger).is_err());
        assert!(ensure_role(&ctx("admin"), Role::Admin).is_ok());
    }

    #[test]
    fn comparison_is_exact() {
        let claims = ctx("Admin").claims;
        assert!(!authorize(&claims, &Role::Admin));
        assert!(authorize(&claims, &Role::Unknown("Admin".to_string())));
    }
}
