//! Mapping of domain and auth failures onto HTTP responses.

use crate::state::AppState;
use api_shared::{ApiResponse, AuthError};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sepshield_core::CoreError;

const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The request could not be read into the expected shape.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Internal error text attached to 500 responses so that [`expose_error_detail`] can surface it
/// outside production.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e {
                CoreError::InvalidInput(_) | CoreError::Uuid(_) | CoreError::Text(_) => {
                    StatusCode::BAD_REQUEST
                }
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::Conflict(_) => StatusCode::CONFLICT,
                CoreError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(e) => match e {
                AuthError::MissingToken | AuthError::ExpiredToken | AuthError::InvalidToken(_) => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::MissingSecret | AuthError::TokenCreation(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Rejected { status, .. } => *status,
            ApiError::Encode(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client.
    fn client_message(&self) -> String {
        match self {
            ApiError::Core(CoreError::InvalidInput(message)) => message.clone(),
            ApiError::Core(CoreError::NotFound { entity, .. }) => format!("{entity} not found"),
            _ => self.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self);
            let mut response =
                (status, Json(ApiResponse::error(INTERNAL_ERROR_MESSAGE))).into_response();
            response
                .extensions_mut()
                .insert(ErrorDetail(self.to_string()));
            return response;
        }
        (status, Json(ApiResponse::error(self.client_message()))).into_response()
    }
}

/// Adds an `error` field with the internal failure to 500 bodies unless running in production.
pub async fn expose_error_detail(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if state.config.is_production() {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let body = serde_json::json!({
        "success": false,
        "message": INTERNAL_ERROR_MESSAGE,
        "error": detail,
    });
    (response.status(), Json(body)).into_response()
}
