//! Device-side library: enroll with the backend, keep the Cloudant session
//! alive and read/write todo items in the user's database.

mod backend;
mod error;
mod interceptor;
mod store;

pub use backend::{BackendClient, ENROLL_PATH, Enrollment, SESSION_COOKIE_PATH};
pub use error::Error;
pub use interceptor::{CookieSource, RefreshEndpoint, SessionCookieInterceptor};
pub use store::TodoStore;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Supplies the value of the `Authorization` header for backend calls.
///
/// Whatever signs the user in (OAuth token, social login) implements this.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    async fn authorization(&self) -> Result<String, Error>;
}

/// A fixed `Authorization` header value.
pub struct StaticAuthorization {
    value: SecretString,
}

impl StaticAuthorization {
    #[must_use]
    pub const fn new(value: SecretString) -> Self {
        Self { value }
    }
}

#[async_trait]
impl AuthorizationProvider for StaticAuthorization {
    async fn authorization(&self) -> Result<String, Error> {
        let value = self.value.expose_secret();
        if value.is_empty() {
            return Err(Error::Authorization("empty authorization header".to_string()));
        }
        Ok(value.to_string())
    }
}
