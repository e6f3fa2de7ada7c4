//! Request extractors: JSON bodies and query strings with enveloped rejections, and the
//! authenticated caller.

use crate::error::ApiError;
use crate::state::AppState;
use api_shared::auth::extract_token;
use api_shared::AuthError;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use sepshield_core::user::Role;
use sepshield_core::CoreError;
use sepshield_uuid::RecordId;

/// `axum::Json` whose rejection is an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` whose rejection is an [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Parses a path segment as a record id.
pub fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    Ok(RecordId::parse(raw).map_err(CoreError::from)?)
}

/// The account behind the request's session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: RecordId,
    pub role: Role,
    pub email: String,
}

impl CurrentUser {
    /// Allows the request only if the caller holds one of `roles`.
    pub fn restrict_to(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            return Ok(());
        }
        Err(CoreError::Forbidden("You do not have permission to perform this action".into()).into())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(
            header_str(&parts.headers, AUTHORIZATION),
            header_str(&parts.headers, COOKIE),
        )
        .ok_or(AuthError::MissingToken)?;

        let claims = state.tokens.verify(token)?;

        let gone = || {
            CoreError::Unauthenticated("The user belonging to this token no longer exists".into())
        };
        let id = RecordId::parse(&claims.id).map_err(|_| gone())?;
        let users = state.users.clone();
        let lookup = tokio::task::spawn_blocking(move || users.get(&id)).await?;
        let user = match lookup {
            Ok(user) => user,
            Err(CoreError::NotFound { .. }) => return Err(gone().into()),
            Err(e) => return Err(e.into()),
        };

        // Role is read from the stored account, not the token.
        Ok(CurrentUser {
            id: user.id,
            role: user.role,
            email: user.email.as_str().to_string(),
        })
    }
}
