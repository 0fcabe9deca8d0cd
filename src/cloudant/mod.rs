//! Cloudant administration for per-user todo databases.
//!
//! Every call is authenticated with the admin account (HTTP Basic), except
//! [`Cloudant::session_cookie`], which logs in with a per-database API key.
//!
//! Status handling follows idempotent semantics: `412` on create and `404` on
//! delete are success. Any other failure is wrapped into an [`Error`] naming
//! the database, and logged before it is returned.

pub mod design;

mod credentials;
mod error;
mod naming;

pub use credentials::{ApiKey, DATABASE_ROLES};
pub use error::{Detail, Error};
pub use naming::{DATABASE_PREFIX, database_name, validate_name};

use reqwest::{Client, RequestBuilder, StatusCode, header::HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, error, info, instrument};
use url::Url;

/// Where Cloudant listens, as handed to mobile clients in `cloudant_access`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Parse `http(s)://host[:port]`; a missing port defaults from the scheme.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed, has no host, or uses a
    /// scheme other than `http`/`https`.
    pub fn parse(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;

        let protocol = url.scheme().to_string();

        let default_port = match protocol.as_str() {
            "http" => 80,
            "https" => 443,
            _ => return Err(Error::InvalidUrl(format!("unsupported scheme {protocol}"))),
        };

        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl("no host specified".to_string()))?
            .to_string();

        let port = url.port().unwrap_or(default_port);

        Ok(Self {
            protocol,
            host,
            port,
        })
    }

    /// Base URL of the endpoint, with a trailing `/`.
    ///
    /// # Errors
    /// Returns an error if the parts do not form a valid URL.
    pub fn base_url(&self) -> Result<Url, Error> {
        let raw = format!("{}://{}:{}/", self.protocol, self.host, self.port);
        Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))
    }
}

/// Outcome of [`Cloudant::create_database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    Created,
    AlreadyExists,
}

/// Outcome of [`Cloudant::delete_database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    NotFound,
}

/// Admin client for one Cloudant account.
#[derive(Clone)]
pub struct Cloudant {
    client: Client,
    endpoint: Endpoint,
    base: Url,
    username: String,
    password: SecretString,
}

impl fmt::Debug for Cloudant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cloudant")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"***")
            .finish_non_exhaustive()
    }
}

pub(crate) struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    fn detail(&self) -> Detail {
        let field = |name: &str| {
            self.body
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Detail::Status {
            status: self.status.as_u16(),
            error: field("error"),
            reason: field("reason"),
        }
    }
}

impl Cloudant {
    /// # Errors
    /// Returns an error if the endpoint is not a valid base URL or the HTTP
    /// client cannot be built.
    pub fn new(endpoint: Endpoint, username: String, password: SecretString) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;

        let base = endpoint.base_url()?;

        Ok(Self {
            client,
            endpoint,
            base,
            username,
            password,
        })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Base URL joined with percent-encoded path segments.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // http(s) URLs always have a path to append to
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<Reply, Detail> {
        let response = request.send().await.map_err(|e| Detail::transport(&e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(|e| Detail::transport(&e))?;
        let body = serde_json::from_slice(&bytes).unwrap_or_default();

        debug!("cloudant replied {status}");

        Ok(Reply {
            status,
            headers,
            body,
        })
    }

    pub(crate) async fn admin(&self, request: RequestBuilder) -> Result<Reply, Detail> {
        self.execute(request.basic_auth(&self.username, Some(self.password.expose_secret())))
            .await
    }

    /// Check that Cloudant answers with the admin credentials.
    ///
    /// # Errors
    /// Returns the failure detail if the request fails or is rejected.
    pub async fn ping(&self) -> Result<(), Detail> {
        let reply = self.admin(self.client.get(self.base.clone())).await?;

        if reply.status.is_success() {
            Ok(())
        } else {
            Err(reply.detail())
        }
    }

    /// Create `name`; an existing database is not an error.
    ///
    /// # Errors
    /// Returns an error if the name is invalid or Cloudant refuses the
    /// request with anything other than `412`.
    #[instrument(skip(self))]
    pub async fn create_database(&self, name: &str) -> Result<Creation, Error> {
        validate_name(name)?;

        info!("Creating database: {name}");

        let wrap = |detail: Detail| {
            error!("Failed to create database ({name}); error = {detail}");
            Error::CreateDatabase {
                database: name.to_string(),
                detail,
            }
        };

        let reply = self
            .admin(self.client.put(self.url(&[name])))
            .await
            .map_err(wrap)?;

        match reply.status {
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                info!("Database ({name}) created successfully.");
                Ok(Creation::Created)
            }
            StatusCode::PRECONDITION_FAILED => {
                info!("Database ({name}) already created.");
                Ok(Creation::AlreadyExists)
            }
            _ => Err(wrap(reply.detail())),
        }
    }

    /// Delete `name`; a missing database is not an error.
    ///
    /// # Errors
    /// Returns an error if the name is invalid or Cloudant refuses the
    /// request with anything other than `404`.
    #[instrument(skip(self))]
    pub async fn delete_database(&self, name: &str) -> Result<Deletion, Error> {
        validate_name(name)?;

        info!("Deleting database: {name}");

        let wrap = |detail: Detail| {
            error!("Failed to delete database ({name}); error = {detail}");
            Error::DeleteDatabase {
                database: name.to_string(),
                detail,
            }
        };

        let reply = self
            .admin(self.client.delete(self.url(&[name])))
            .await
            .map_err(wrap)?;

        match reply.status {
            StatusCode::OK | StatusCode::ACCEPTED => {
                info!("Database ({name}) deleted successfully.");
                Ok(Deletion::Deleted)
            }
            StatusCode::NOT_FOUND => {
                info!("Database ({name}) does not exist; nothing more to do.");
                Ok(Deletion::NotFound)
            }
            _ => Err(wrap(reply.detail())),
        }
    }

    /// Store `body` as `_design/{design}` in `database`.
    ///
    /// # Errors
    /// Returns the failure detail if the document is not accepted.
    pub async fn put_design_document(
        &self,
        database: &str,
        design: &str,
        body: &Value,
    ) -> Result<(), Detail> {
        let url = self.url(&[database, "_design", design]);
        let reply = self.admin(self.client.put(url).json(body)).await?;

        if reply.status.is_success() {
            Ok(())
        } else {
            Err(reply.detail())
        }
    }

    /// Create a Cloudant Query index in `database`.
    ///
    /// # Errors
    /// Returns the failure detail if the index is not accepted.
    pub async fn create_index(&self, database: &str, definition: &Value) -> Result<(), Detail> {
        let url = self.url(&[database, "_index"]);
        let reply = self.admin(self.client.post(url).json(definition)).await?;

        if reply.status.is_success() {
            Ok(())
        } else {
            Err(reply.detail())
        }
    }

    /// Create the todo database `name`. Views and the `@datatype` index are
    /// installed only when the database did not exist yet.
    ///
    /// # Errors
    /// Returns an error if creation fails, or a view/index error naming the
    /// database when creation succeeded but the design documents did not.
    #[instrument(skip(self))]
    pub async fn provision(&self, name: &str) -> Result<Creation, Error> {
        let creation = self.create_database(name).await?;

        if creation == Creation::AlreadyExists {
            return Ok(creation);
        }

        for view in &design::VIEWS {
            info!("Creating view: _design/{}", view.design);

            if let Err(detail) = self
                .put_design_document(name, view.design, &view.document())
                .await
            {
                error!(
                    "Failed to create {} view for database ({name}); error = {detail}",
                    view.name
                );
                return Err(Error::View {
                    database: name.to_string(),
                    view: view.name,
                    detail,
                });
            }

            info!("{} view for database ({name}) created successfully.", view.name);
        }

        info!("Creating index: _design/{}", design::DATATYPE_INDEX_DESIGN);

        if let Err(detail) = self.create_index(name, &design::datatype_index()).await {
            error!("Failed to create @datatype index for database ({name}); error = {detail}");
            return Err(Error::Index {
                database: name.to_string(),
                detail,
            });
        }

        info!("@datatype index for database ({name}) created successfully.");

        Ok(creation)
    }
}
