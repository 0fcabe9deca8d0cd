//! Route handlers and the error type they share.

pub mod enroll;
pub mod health;
pub mod root;
pub mod session_cookie;

use crate::{
    api::{
        AppState,
        auth::{AuthError, Identity},
    },
    cloudant,
};
use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Body of every error response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    NotEnrolled(String),
    AuthUnavailable(String),
    Cloudant(cloudant::Error),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotEnrolled(_) => StatusCode::NOT_FOUND,
            Self::AuthUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Cloudant(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Unauthorized(message) => format!("Unauthorized: {message}"),
            Self::NotEnrolled(user) => format!("User {user} is not enrolled"),
            Self::AuthUnavailable(message) => {
                format!("Authorization service unavailable: {message}")
            }
            Self::Cloudant(err) => err.to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing | AuthError::Rejected(_) => Self::Unauthorized(err.to_string()),
            AuthError::Unavailable(message) => Self::AuthUnavailable(message),
        }
    }
}

impl From<cloudant::Error> for ApiError {
    fn from(err: cloudant::Error) -> Self {
        Self::Cloudant(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        error!("{status}: {message}");

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Resolve the `Authorization` header of the request.
pub(crate) async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or(AuthError::Missing)?;

    let identity = state.authenticator.authenticate(authorization).await?;

    Ok(identity)
}
