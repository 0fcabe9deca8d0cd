use super::{
    AuthorizationProvider, Error, RefreshEndpoint, SessionCookieInterceptor, TodoStore,
};
use crate::cloudant::Endpoint;
use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use url::Url;

pub const ENROLL_PATH: &str = "bluelist/enroll";
pub const SESSION_COOKIE_PATH: &str = "bluelist/sessioncookie";

/// What `enroll` hands back: where the user's database lives and a first
/// session cookie for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Enrollment {
    pub cloudant_access: Endpoint,
    pub database: String,
    #[serde(rename = "sessionCookie")]
    pub session_cookie: String,
}

impl Enrollment {
    /// `protocol://host:port/database`
    ///
    /// # Errors
    /// Returns an error if the parts do not form a valid URL.
    pub fn remote_database_url(&self) -> Result<Url, Error> {
        let access = &self.cloudant_access;
        let mut url = Url::parse(&format!(
            "{}://{}:{}/",
            access.protocol, access.host, access.port
        ))?;
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.database);
        }
        Ok(url)
    }
}

/// Client for the BlueList backend.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base: Url,
    authorization: Arc<dyn AuthorizationProvider>,
}

impl BackendClient {
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, authorization: Arc<dyn AuthorizationProvider>) -> Result<Self, Error> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base,
            authorization,
        })
    }

    /// Provision (or reuse) the caller's database and get a session cookie.
    ///
    /// # Errors
    /// Returns an error if the backend is unreachable, answers with a status
    /// other than `200`, or the reply is not an enrollment.
    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn enroll(&self) -> Result<Enrollment, Error> {
        let authorization = self.authorization.authorization().await?;
        let url = self.base.join(ENROLL_PATH)?;

        let response = self
            .client
            .put(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| {
                error!("Enroll request failed: {e}");
                Error::from(e)
            })?;

        if response.status() != StatusCode::OK {
            let err = Error::InvalidStatus {
                status: response.status().as_u16(),
            };
            error!("{err}");
            return Err(err);
        }

        let enrollment: Enrollment = response.json().await.map_err(|e| {
            let err = Error::MalformedPayload {
                call: "enroll",
                message: e.to_string(),
            };
            error!("{err}");
            err
        })?;

        info!("Enrolled with database {}", enrollment.database);

        Ok(enrollment)
    }

    /// Cookie source backed by the `sessioncookie` endpoint.
    ///
    /// # Errors
    /// Returns an error if the endpoint URL cannot be built.
    pub fn refresh_endpoint(&self) -> Result<RefreshEndpoint, Error> {
        Ok(RefreshEndpoint::new(
            self.client.clone(),
            self.base.join(SESSION_COOKIE_PATH)?,
            Arc::clone(&self.authorization),
        ))
    }

    /// Enroll and open the user's todo store, seeded with the enrollment
    /// cookie.
    ///
    /// # Errors
    /// Returns the enrollment error, or an error if the database URL is
    /// invalid.
    pub async fn connect(&self) -> Result<TodoStore, Error> {
        let enrollment = self.enroll().await?;
        let database = enrollment.remote_database_url()?;

        let interceptor = SessionCookieInterceptor::with_cookie(
            self.client.clone(),
            Arc::new(self.refresh_endpoint()?),
            enrollment.session_cookie,
        );

        Ok(TodoStore::new(database, interceptor))
    }
}
