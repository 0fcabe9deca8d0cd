use std::fmt;
use thiserror::Error;

/// What Cloudant (or the network) said when a call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detail {
    Status {
        status: u16,
        error: String,
        reason: String,
    },
    Transport(String),
}

impl Detail {
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }

    /// HTTP status, when the request reached Cloudant.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status {
                status,
                error,
                reason,
            } => {
                write!(f, "status {status}")?;
                if !error.is_empty() {
                    write!(f, ", {error}")?;
                }
                if !reason.is_empty() {
                    write!(f, ": {reason}")?;
                }
                Ok(())
            }
            Self::Transport(message) => f.write_str(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid database name {0:?}")]
    InvalidName(String),
    #[error("invalid Cloudant URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to create database {database}; error = {detail}")]
    CreateDatabase { database: String, detail: Detail },
    #[error("Failed to delete database {database}; error = {detail}")]
    DeleteDatabase { database: String, detail: Detail },
    #[error("Created database {database} but failed to create {view} view; error = {detail}")]
    View {
        database: String,
        view: &'static str,
        detail: Detail,
    },
    #[error("Created database {database} but failed to create index '@datatype'; error = {detail}")]
    Index { database: String, detail: Detail },
    #[error("Failed to generate API key; error = {detail}")]
    ApiKey { detail: Detail },
    #[error("Failed to grant access to database {database}; error = {detail}")]
    Permissions { database: String, detail: Detail },
    #[error("Failed to access registry credentials for database {database}; error = {detail}")]
    Registry { database: String, detail: Detail },
    #[error("Failed to open Cloudant session; error = {detail}")]
    Session { detail: Detail },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl Error {
    /// Database named by the error, if any.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        match self {
            Self::CreateDatabase { database, .. }
            | Self::DeleteDatabase { database, .. }
            | Self::View { database, .. }
            | Self::Index { database, .. }
            | Self::Permissions { database, .. }
            | Self::Registry { database, .. } => Some(database),
            Self::InvalidName(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_display() {
        let detail = Detail::Status {
            status: 500,
            error: "internal_server_error".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(detail.to_string(), "status 500, internal_server_error: boom");
        assert_eq!(detail.status(), Some(500));

        let detail = Detail::Transport("connection refused".to_string());
        assert_eq!(detail.to_string(), "connection refused");
        assert_eq!(detail.status(), None);
    }

    #[test]
    fn view_error_names_created_database() {
        let err = Error::View {
            database: "todosdb_x".to_string(),
            view: "keyCountTyped",
            detail: Detail::Status {
                status: 409,
                error: "conflict".to_string(),
                reason: String::new(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Created database todosdb_x but failed to create keyCountTyped view; error = status 409, conflict"
        );
        assert_eq!(err.database(), Some("todosdb_x"));
    }

    #[test]
    fn cloudant_reason_keeps_its_own_punctuation() {
        let err = Error::Registry {
            database: "todosdb_r".to_string(),
            detail: Detail::Status {
                status: 409,
                error: "conflict".to_string(),
                reason: "Document update conflict.".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Failed to access registry credentials for database todosdb_r; error = status 409, conflict: Document update conflict."
        );
    }
}
