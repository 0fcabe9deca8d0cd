//! API-key credentials for user databases.
//!
//! Flow: enroll generates one API key per user database, grants it the
//! database roles and stores it in the registry database under the user
//! database's name. Session refreshes read it back and log in with it.

use super::{Cloudant, Detail, Error};
use reqwest::{
    StatusCode,
    header::{HeaderMap, SET_COOKIE},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use tracing::{error, info, instrument, warn};

/// Roles granted to a user's API key on the user's own database.
pub const DATABASE_ROLES: [&str; 3] = ["_reader", "_writer", "_replicator"];

const SESSION_COOKIE_NAME: &str = "AuthSession";

#[derive(Clone)]
pub struct ApiKey {
    pub key: String,
    pub password: SecretString,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &self.key)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct StoredKey {
    key: String,
    password: String,
}

impl From<StoredKey> for ApiKey {
    fn from(stored: StoredKey) -> Self {
        Self {
            key: stored.key,
            password: SecretString::from(stored.password),
        }
    }
}

impl Cloudant {
    /// Ask Cloudant for a new API key.
    ///
    /// # Errors
    /// Returns an error if the request fails or the reply has no key.
    #[instrument(skip(self))]
    pub async fn generate_api_key(&self) -> Result<ApiKey, Error> {
        let wrap = |detail: Detail| {
            error!("Failed to generate API key; error = {detail}");
            Error::ApiKey { detail }
        };

        let url = self.url(&["_api", "v2", "api_keys"]);
        let reply = self.admin(self.client.post(url)).await.map_err(wrap)?;

        if !reply.status.is_success() {
            return Err(wrap(reply.detail()));
        }

        let detail = reply.detail();
        let stored: StoredKey = serde_json::from_value(reply.body).map_err(|e| {
            wrap(Detail::Status {
                status: reply.status.as_u16(),
                error: "invalid_response".to_string(),
                reason: e.to_string(),
            })
        })?;

        if stored.key.is_empty() {
            return Err(wrap(detail));
        }

        info!("Generated API key {}", stored.key);

        Ok(stored.into())
    }

    /// Add `key` with `roles` to the Cloudant security document of `database`.
    ///
    /// # Errors
    /// Returns an error if the security document cannot be read or written.
    #[instrument(skip(self))]
    pub async fn grant_access(
        &self,
        database: &str,
        key: &str,
        roles: &[&str],
    ) -> Result<(), Error> {
        self.update_security(database, key, |security| with_roles(security, key, roles))
            .await?;

        info!("Granted {roles:?} on database ({database}) to {key}");

        Ok(())
    }

    /// Remove `key` from the Cloudant security document of `database`.
    ///
    /// # Errors
    /// Returns an error if the security document cannot be read or written.
    #[instrument(skip(self))]
    pub async fn revoke_access(&self, database: &str, key: &str) -> Result<(), Error> {
        self.update_security(database, key, |security| without_key(security, key))
            .await?;

        info!("Revoked access to database ({database}) for {key}");

        Ok(())
    }

    async fn update_security(
        &self,
        database: &str,
        key: &str,
        edit: impl FnOnce(Value) -> Value,
    ) -> Result<(), Error> {
        let wrap = |detail: Detail| {
            error!("Failed to set permissions for {key} on database ({database}); error = {detail}");
            Error::Permissions {
                database: database.to_string(),
                detail,
            }
        };

        let url = self.url(&["_api", "v2", "db", database, "_security"]);

        let reply = self
            .admin(self.client.get(url.clone()))
            .await
            .map_err(wrap)?;
        if !reply.status.is_success() {
            return Err(wrap(reply.detail()));
        }

        let security = edit(reply.body);

        let reply = self
            .admin(self.client.put(url).json(&security))
            .await
            .map_err(wrap)?;
        if !reply.status.is_success() {
            return Err(wrap(reply.detail()));
        }

        Ok(())
    }

    /// Read the stored key for `database`; `None` when the user never enrolled.
    ///
    /// # Errors
    /// Returns an error if the registry cannot be read.
    #[instrument(skip(self))]
    pub async fn load_credentials(
        &self,
        registry: &str,
        database: &str,
    ) -> Result<Option<ApiKey>, Error> {
        let wrap = |detail: Detail| {
            error!("Failed to read credentials for database ({database}); error = {detail}");
            Error::Registry {
                database: database.to_string(),
                detail,
            }
        };

        let reply = self
            .admin(self.client.get(self.url(&[registry, database])))
            .await
            .map_err(wrap)?;

        match reply.status {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let stored: StoredKey = serde_json::from_value(reply.body).map_err(|e| {
                    wrap(Detail::Status {
                        status: status.as_u16(),
                        error: "invalid_document".to_string(),
                        reason: e.to_string(),
                    })
                })?;
                Ok(Some(stored.into()))
            }
            _ => Err(wrap(reply.detail())),
        }
    }

    /// Persist `api_key` as the credentials of `database`.
    ///
    /// # Errors
    /// Returns an error if the registry rejects the document.
    #[instrument(skip(self, api_key))]
    pub async fn store_credentials(
        &self,
        registry: &str,
        database: &str,
        api_key: &ApiKey,
    ) -> Result<(), Error> {
        let stored = StoredKey {
            key: api_key.key.clone(),
            password: api_key.password.expose_secret().to_string(),
        };

        let wrap = |detail: Detail| {
            error!("Failed to store credentials for database ({database}); error = {detail}");
            Error::Registry {
                database: database.to_string(),
                detail,
            }
        };

        let reply = self
            .admin(self.client.put(self.url(&[registry, database])).json(&stored))
            .await
            .map_err(wrap)?;

        if reply.status.is_success() {
            Ok(())
        } else {
            Err(wrap(reply.detail()))
        }
    }

    /// Remove the stored credentials of `database`; missing entries are fine.
    ///
    /// # Errors
    /// Returns an error if the registry entry cannot be read or deleted.
    #[instrument(skip(self))]
    pub async fn forget_credentials(&self, registry: &str, database: &str) -> Result<bool, Error> {
        let wrap = |detail: Detail| {
            error!("Failed to remove credentials for database ({database}); error = {detail}");
            Error::Registry {
                database: database.to_string(),
                detail,
            }
        };

        let url = self.url(&[registry, database]);

        let reply = self
            .admin(self.client.get(url.clone()))
            .await
            .map_err(wrap)?;
        if reply.status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !reply.status.is_success() {
            return Err(wrap(reply.detail()));
        }

        let rev = reply
            .body
            .get("_rev")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let reply = self
            .admin(self.client.delete(url).query(&[("rev", rev)]))
            .await
            .map_err(wrap)?;

        match reply.status {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => {
                info!("Removed credentials for database ({database})");
                Ok(true)
            }
            _ => Err(wrap(reply.detail())),
        }
    }

    /// Stored credentials for `database`, creating and granting a new API key
    /// the first time.
    ///
    /// When a concurrent enroll stores its key first, the registry answers
    /// `409`; the stored key wins and the one generated here is revoked.
    ///
    /// # Errors
    /// Returns an error if any registry, key or permission call fails.
    #[instrument(skip(self))]
    pub async fn ensure_credentials(&self, registry: &str, database: &str) -> Result<ApiKey, Error> {
        if let Some(existing) = self.load_credentials(registry, database).await? {
            return Ok(existing);
        }

        let api_key = self.generate_api_key().await?;
        self.grant_access(database, &api_key.key, &DATABASE_ROLES)
            .await?;

        match self.store_credentials(registry, database, &api_key).await {
            Ok(()) => Ok(api_key),
            Err(Error::Registry {
                detail: conflict @ Detail::Status { status: 409, .. },
                ..
            }) => {
                warn!("Credentials for database ({database}) were stored concurrently; using the stored key");

                if let Err(e) = self.revoke_access(database, &api_key.key).await {
                    warn!("Could not revoke unused API key {}: {e}", api_key.key);
                }

                self.load_credentials(registry, database)
                    .await?
                    .ok_or_else(|| Error::Registry {
                        database: database.to_string(),
                        detail: conflict,
                    })
            }
            Err(err) => Err(err),
        }
    }

    /// Log in with `api_key` and return the `AuthSession=...` cookie pair.
    ///
    /// # Errors
    /// Returns an error if the login is rejected or no session cookie is set.
    #[instrument(skip(self, api_key), fields(key = %api_key.key))]
    pub async fn session_cookie(&self, api_key: &ApiKey) -> Result<String, Error> {
        let wrap = |detail: Detail| {
            error!("Failed to open session for {}; error = {detail}", api_key.key);
            Error::Session { detail }
        };

        let form = [
            ("name", api_key.key.as_str()),
            ("password", api_key.password.expose_secret()),
        ];

        let reply = self
            .execute(self.client.post(self.url(&["_session"])).form(&form))
            .await
            .map_err(wrap)?;

        if !reply.status.is_success() {
            return Err(wrap(reply.detail()));
        }

        auth_session_cookie(&reply.headers).ok_or_else(|| {
            wrap(Detail::Status {
                status: reply.status.as_u16(),
                error: "missing_cookie".to_string(),
                reason: format!("no {SESSION_COOKIE_NAME} cookie in response"),
            })
        })
    }
}

/// Security document with `key` holding `roles` in the `cloudant` section.
fn with_roles(mut security: Value, key: &str, roles: &[&str]) -> Value {
    if !security.is_object() {
        security = json!({});
    }
    if !security["cloudant"].is_object() {
        security["cloudant"] = json!({});
    }
    security["cloudant"][key] = json!(roles);
    security
}

/// Security document without `key` in the `cloudant` section.
fn without_key(mut security: Value, key: &str) -> Value {
    if let Some(cloudant) = security.get_mut("cloudant").and_then(Value::as_object_mut) {
        cloudant.remove(key);
    }
    security
}

/// `AuthSession=...` pair from the `Set-Cookie` headers, attributes stripped.
fn auth_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .find(|pair| {
            pair.split_once('=')
                .is_some_and(|(name, _)| name == SESSION_COOKIE_NAME)
        })
        .map(str::to_string)
}
