use thiserror::Error;

/// Client-side failures.
///
/// `Clone` because the outcome of a shared cookie refresh is handed to every
/// request waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Invalid HTTP Status {status}. Check NodeJS application on Bluemix")]
    InvalidStatus { status: u16 },
    #[error("No JSON data returned from {call} call: {message}")]
    MalformedPayload { call: &'static str, message: String },
    #[error("No authorization available: {0}")]
    Authorization(String),
    #[error("Session rejected with status {status} after refreshing the cookie")]
    SessionRejected { status: u16 },
    #[error("Store request failed ({status}): {reason}")]
    Store { status: u16, reason: String },
    #[error("Todo item {0:?} has not been stored yet")]
    NotStored(String),
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Url(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_status_message() {
        assert_eq!(
            Error::InvalidStatus { status: 500 }.to_string(),
            "Invalid HTTP Status 500. Check NodeJS application on Bluemix"
        );
    }

    #[test]
    fn malformed_payload_names_the_call() {
        let err = Error::MalformedPayload {
            call: "enroll",
            message: "missing field `sessionCookie`".to_string(),
        };
        assert!(err.to_string().starts_with("No JSON data returned from enroll call"));
    }
}
