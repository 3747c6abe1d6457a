use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use common_auth::{authorize, ensure_role, AuthContext, Role, ROLE_ADMIN, ROLE_USER};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::store::with_deadline;
use crate::users::{NewUser, UserView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PasswordReset {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

async fn insert_user(state: &AppState, new_user: NewUser) -> ApiResult<UserView> {
    let record = new_user.into_record()?;
    with_deadline(state.store_timeout, state.users.insert(&record)).await?;
    Ok(record.view())
}

/// Public self-registration; the requested role is ignored.
pub async fn register_user(
    State(state): State<AppState>,
    Json(mut new_user): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    new_user.role = ROLE_USER.to_string();

    let user = insert_user(&state, new_user).await?;
    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Staff accounts. The role defaults to `admin`; an admin may also name
/// another known role, such as `eventLogger` for intake operators.
pub async fn create_admin(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(mut new_user): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    ensure_role(&auth, Role::Admin)?;

    if new_user.role.trim().is_empty() {
        new_user.role = ROLE_ADMIN.to_string();
    }
    let user = insert_user(&state, new_user).await?;
    info!(user_id = %user.id, role = %user.role, created_by = %auth.claims.sub, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<UserView>>> {
    ensure_role(&auth, Role::Admin)?;

    let users = with_deadline(state.store_timeout, state.users.list()).await?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// Admins may read any user; everyone else only themselves.
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<UserView>> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound("User"))?;
    if id != auth.claims.sub && !authorize(&auth.claims, &Role::Admin) {
        warn!(sub = %auth.claims.sub, requested = %id, "user lookup refused");
        return Err(ApiError::AuthorizationDenied);
    }

    let user = with_deadline(state.store_timeout, state.users.find_by_id(id))
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user.view()))
}

/// Changes the caller's own password and ends their outstanding session.
pub async fn reset_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<PasswordReset>,
) -> ApiResult<StatusCode> {
    state
        .sessions
        .reset_password(auth.claims.sub, &body.old_password, &body.new_password)
        .await?;
    Ok(StatusCode::OK)
}
