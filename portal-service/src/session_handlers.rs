use axum::{extract::State, http::StatusCode, Form, Json};
use common_auth::{AuthContext, BearerToken, Role};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::session::SignInData;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

async fn sign_in_as(
    state: &AppState,
    form: SignInForm,
    required_role: Option<Role>,
) -> ApiResult<Json<SignInData>> {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        state.metrics.signin_attempt("bad_request");
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    match state
        .sessions
        .sign_in(email, &form.password, required_role)
        .await
    {
        Ok(data) => {
            state.metrics.signin_attempt("success");
            Ok(Json(data))
        }
        Err(err) => {
            let outcome = match err {
                ApiError::AuthenticationFailure => "invalid_credentials",
                _ => "error",
            };
            state.metrics.signin_attempt(outcome);
            Err(err)
        }
    }
}

pub async fn signin(
    State(state): State<AppState>,
    Form(form): Form<SignInForm>,
) -> ApiResult<Json<SignInData>> {
    sign_in_as(&state, form, None).await
}

pub async fn admin_signin(
    State(state): State<AppState>,
    Form(form): Form<SignInForm>,
) -> ApiResult<Json<SignInData>> {
    sign_in_as(&state, form, Some(Role::Admin)).await
}

pub async fn event_logger_signin(
    State(state): State<AppState>,
    Form(form): Form<SignInForm>,
) -> ApiResult<Json<SignInData>> {
    sign_in_as(&state, form, Some(Role::EventLogger)).await
}

/// The bearer header carries the access credential the refresh credential
/// was bound to; it may already be expired.
pub async fn refresh_access_token(
    State(state): State<AppState>,
    BearerToken(access): BearerToken,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<SignInData>> {
    match state.sessions.refresh(&access, &body.refresh).await {
        Ok(data) => {
            state.metrics.refresh("success");
            Ok(Json(data))
        }
        Err(err) => {
            state.metrics.refresh("rejected");
            Err(err)
        }
    }
}

pub async fn signout(State(state): State<AppState>, auth: AuthContext) -> ApiResult<StatusCode> {
    state.sessions.sign_out(auth.claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn verify_token(_auth: AuthContext) -> Json<VerifyResponse> {
    Json(VerifyResponse { valid: true })
}
