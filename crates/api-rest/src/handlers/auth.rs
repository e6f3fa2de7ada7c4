//! Registration, login and self-service account endpoints.
//!
//! Successful register, login and password change answer with a fresh session token, both in the
//! body and as the `token` cookie.

use super::to_data;
use crate::error::ApiError;
use crate::extract::{ApiJson, CurrentUser};
use crate::state::AppState;
use api_shared::auth::TOKEN_COOKIE;
use api_shared::{ApiResponse, AuthRes};
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use sepshield_core::user::{Credentials, PasswordChange, ProfileUpdate, Registration, User};

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{TOKEN_COOKIE}={token}; HttpOnly; Path=/; Max-Age={max_age_secs}; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn session_response(state: &AppState, user: &User, status: StatusCode) -> Result<Response, ApiError> {
    let token = state.tokens.issue(
        &user.id.to_string(),
        user.role.as_str(),
        user.email.as_str(),
        Utc::now(),
    )?;
    let cookie = session_cookie(
        &token,
        state.tokens.lifetime().num_seconds(),
        state.config.is_production(),
    );
    let body = AuthRes {
        success: true,
        token,
        user: to_data(&user.profile())?,
    };
    Ok((status, [(SET_COOKIE, cookie)], Json(body)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = Registration,
    security((), ("bearer_auth" = [])),
    responses(
        (status = 201, description = "Account created. Without a session the new account is also logged in", body = AuthRes),
        (status = 400, description = "Password too short, or a privileged role requested without a session", body = ApiResponse),
        (status = 403, description = "Only an administrator can create doctor or admin accounts", body = ApiResponse),
        (status = 409, description = "Email already in use", body = ApiResponse)
    )
)]
/// Register a staff account
///
/// Without a session this is a nurse sign-up and the new account is logged in. An admin session
/// may create accounts with any role; the admin's own session is left in place.
///
/// # Errors
/// Returns `409 Conflict` if the e-mail address is already registered.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    caller: Option<CurrentUser>,
    ApiJson(req): ApiJson<Registration>,
) -> Result<Response, ApiError> {
    let user = state.users.sign_up(req, caller.as_ref().map(|c| c.role))?;

    if let Some(caller) = caller {
        tracing::info!("-- {} {} created {} account {}", caller.role, caller.id, user.role, user.id);
        let body = ApiResponse::data(to_data(&user.profile())?);
        return Ok((StatusCode::CREATED, Json(body)).into_response());
    }
    session_response(&state, &user, StatusCode::CREATED)
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Logged in", body = AuthRes),
        (status = 400, description = "Email or password missing", body = ApiResponse),
        (status = 401, description = "Incorrect email or password", body = ApiResponse)
    )
)]
/// Log in
///
/// # Errors
/// Returns `401 Unauthorized` for an unknown e-mail or a wrong password, with the same message
/// in both cases.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Credentials>,
) -> Result<Response, ApiError> {
    let user = state.users.authenticate(req)?;
    tracing::info!("-- {} {} logged in", user.role, user.id);
    session_response(&state, &user, StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = ApiResponse)
    )
)]
/// Log out
///
/// Clears the session cookie. Bearer tokens stay valid until they expire.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = session_cookie("", 0, state.config.is_production());
    (
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::message("Logged out successfully")),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's profile", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse>, ApiError> {
    let user = state.users.get(&user.id)?;
    Ok(Json(ApiResponse::data(to_data(&user.profile())?)))
}

#[utoipa::path(
    put,
    path = "/api/auth/update-password",
    request_body = PasswordChange,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Password changed; new session issued", body = AuthRes),
        (status = 400, description = "New password too short", body = ApiResponse),
        (status = 401, description = "Current password incorrect", body = ApiResponse)
    )
)]
/// Change the caller's password
#[axum::debug_handler]
pub async fn update_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<PasswordChange>,
) -> Result<Response, ApiError> {
    let user = state.users.change_password(&user.id, req)?;
    session_response(&state, &user, StatusCode::OK)
}

#[utoipa::path(
    put,
    path = "/api/auth/update-me",
    request_body = ProfileUpdate,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse),
        (status = 400, description = "Password fields are not accepted here", body = ApiResponse),
        (status = 409, description = "Email already in use", body = ApiResponse)
    )
)]
/// Update the caller's name, e-mail, department or avatar
#[axum::debug_handler]
pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<ProfileUpdate>,
) -> Result<Json<ApiResponse>, ApiError> {
    let user = state.users.update_profile(&user.id, req)?;
    Ok(Json(ApiResponse::data(to_data(&user.profile())?)))
}
