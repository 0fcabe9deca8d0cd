//! Resolving the caller of `enroll`/`sessioncookie` to a user identity.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

/// The authenticated user; `id` is what the database name is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    Missing,
    #[error("authorization rejected: {0}")]
    Rejected(String),
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve an `Authorization` header value.
    async fn authenticate(&self, authorization: &str) -> Result<Identity, AuthError>;
}

/// Forwards the caller's `Authorization` header to an identity endpoint and
/// reads the user from its `{"id": ...}` reply.
pub struct RemoteAuthenticator {
    client: Client,
    url: Url,
}

impl RemoteAuthenticator {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: Url) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Authenticator for RemoteAuthenticator {
    #[instrument(skip(self, authorization), fields(url = %self.url))]
    async fn authenticate(&self, authorization: &str) -> Result<Identity, AuthError> {
        if authorization.trim().is_empty() {
            return Err(AuthError::Missing);
        }

        let response = self
            .client
            .get(self.url.clone())
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| {
                error!("Identity request failed: {e}");
                AuthError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_server_error() {
            error!("Identity service answered {status}");
            return Err(AuthError::Unavailable(status.to_string()));
        }
        if status != StatusCode::OK {
            debug!("Identity service rejected authorization: {status}");
            return Err(AuthError::Rejected(status.to_string()));
        }

        let identity: Identity = response.json().await.map_err(|e| {
            error!("Identity reply is not valid: {e}");
            AuthError::Unavailable(e.to_string())
        })?;

        if identity.id.is_empty() {
            return Err(AuthError::Rejected("empty user id".to_string()));
        }

        Ok(identity)
    }
}
