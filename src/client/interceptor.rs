//! Session cookie handling for requests to the user's database.
//!
//! The interceptor attaches the cached `AuthSession` cookie to every request.
//! When Cloudant answers `401`/`403` the cookie is refreshed through a
//! [`CookieSource`] and the request is sent once more. Concurrent requests
//! share a single refresh: the first one to need a cookie starts it, the
//! others await the same shared future.

use super::{AuthorizationProvider, Error};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{AUTHORIZATION, COOKIE, HeaderValue},
};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Hands out fresh session cookies.
#[async_trait]
pub trait CookieSource: Send + Sync {
    async fn session_cookie(&self) -> Result<String, Error>;
}

/// The backend `sessioncookie` endpoint.
pub struct RefreshEndpoint {
    client: Client,
    url: Url,
    authorization: Arc<dyn AuthorizationProvider>,
}

#[derive(Deserialize)]
struct SessionCookieReply {
    #[serde(rename = "sessionCookie")]
    session_cookie: String,
}

impl RefreshEndpoint {
    #[must_use]
    pub fn new(client: Client, url: Url, authorization: Arc<dyn AuthorizationProvider>) -> Self {
        Self {
            client,
            url,
            authorization,
        }
    }
}

#[async_trait]
impl CookieSource for RefreshEndpoint {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn session_cookie(&self) -> Result<String, Error> {
        let authorization = self.authorization.authorization().await?;

        let response = self
            .client
            .post(self.url.clone())
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| {
                error!("Session cookie request failed: {e}");
                Error::from(e)
            })?;

        if response.status() != StatusCode::OK {
            let err = Error::InvalidStatus {
                status: response.status().as_u16(),
            };
            error!("{err}");
            return Err(err);
        }

        let reply: SessionCookieReply = response.json().await.map_err(|e| {
            let err = Error::MalformedPayload {
                call: "sessioncookie",
                message: e.to_string(),
            };
            error!("{err}");
            err
        })?;

        debug!("Obtained new session cookie");

        Ok(reply.session_cookie)
    }
}

type Refresh = Shared<BoxFuture<'static, Result<String, Error>>>;

enum CookieState {
    Empty,
    Cached(String),
    Refreshing(Refresh),
}

enum Next {
    Ready(String),
    Wait(Refresh),
}

/// Attaches the session cookie and retries once after a refresh.
///
/// Cheap to clone; clones share the cookie cache.
#[derive(Clone)]
pub struct SessionCookieInterceptor {
    client: Client,
    source: Arc<dyn CookieSource>,
    state: Arc<Mutex<CookieState>>,
}

impl SessionCookieInterceptor {
    /// Start without a cookie; the first request fetches one.
    #[must_use]
    pub fn new(client: Client, source: Arc<dyn CookieSource>) -> Self {
        Self::with_state(client, source, CookieState::Empty)
    }

    /// Start with the cookie returned by enrollment.
    #[must_use]
    pub fn with_cookie(client: Client, source: Arc<dyn CookieSource>, cookie: String) -> Self {
        Self::with_state(client, source, CookieState::Cached(cookie))
    }

    fn with_state(client: Client, source: Arc<dyn CookieSource>, state: CookieState) -> Self {
        Self {
            client,
            source,
            state: Arc::new(Mutex::new(state)),
        }
    }

    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Cookie currently cached, if no refresh is pending.
    #[must_use]
    pub fn cached(&self) -> Option<String> {
        match &*self.lock() {
            CookieState::Cached(cookie) => Some(cookie.clone()),
            CookieState::Empty | CookieState::Refreshing(_) => None,
        }
    }

    /// Send `request` with the session cookie.
    ///
    /// # Errors
    /// Returns the refresh error if no cookie can be obtained, a transport
    /// error, or [`Error::SessionRejected`] if the request is still refused
    /// after one refresh.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, Error> {
        let request = request.build()?;
        let retry = request.try_clone();

        let cookie = self.current().await?;
        let response = self.send(request, &cookie).await?;

        if !is_rejected(response.status()) {
            return Ok(response);
        }

        let Some(retry) = retry else {
            warn!("Session rejected but request body cannot be replayed");
            return Ok(response);
        };

        debug!("Session rejected with {}, refreshing cookie", response.status());

        let cookie = self.refresh(&cookie).await?;
        let response = self.send(retry, &cookie).await?;

        let status = response.status();
        if is_rejected(status) {
            let err = Error::SessionRejected {
                status: status.as_u16(),
            };
            error!("{err}");
            return Err(err);
        }

        Ok(response)
    }

    async fn send(&self, mut request: reqwest::Request, cookie: &str) -> Result<Response, Error> {
        let value = HeaderValue::from_str(cookie).map_err(|e| Error::MalformedPayload {
            call: "sessioncookie",
            message: e.to_string(),
        })?;
        request.headers_mut().insert(COOKIE, value);

        Ok(self.client.execute(request).await?)
    }

    /// Cached cookie, or the result of the pending (or a new) refresh.
    async fn current(&self) -> Result<String, Error> {
        match self.next(None) {
            Next::Ready(cookie) => Ok(cookie),
            Next::Wait(pending) => pending.await,
        }
    }

    /// A cookie other than `stale`, refreshing if nobody else already did.
    async fn refresh(&self, stale: &str) -> Result<String, Error> {
        match self.next(Some(stale)) {
            Next::Ready(cookie) => Ok(cookie),
            Next::Wait(pending) => pending.await,
        }
    }

    fn next(&self, stale: Option<&str>) -> Next {
        let mut state = self.lock();

        match &*state {
            CookieState::Cached(cookie) if stale != Some(cookie.as_str()) => {
                return Next::Ready(cookie.clone());
            }
            CookieState::Refreshing(pending) => return Next::Wait(pending.clone()),
            CookieState::Cached(_) | CookieState::Empty => {}
        }

        let pending = self.start_refresh();
        *state = CookieState::Refreshing(pending.clone());

        Next::Wait(pending)
    }

    fn start_refresh(&self) -> Refresh {
        let source = Arc::clone(&self.source);
        let state: Weak<Mutex<CookieState>> = Arc::downgrade(&self.state);

        async move {
            let result = source.session_cookie().await;

            if let Some(state) = state.upgrade() {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                *state = match &result {
                    Ok(cookie) => CookieState::Cached(cookie.clone()),
                    Err(_) => CookieState::Empty,
                };
            }

            result
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, CookieState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const fn is_rejected(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}
