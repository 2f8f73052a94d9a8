use http::StatusCode;
use thiserror::Error;

use crate::event::EventParseError;

/// Enumeration of errors returned by calls to the host lifecycle API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{address} is not a valid lifecycle API address: {source}")]
    InvalidAddress {
        address: String,
        source: url::ParseError,
    },
    #[error("failed to construct HTTP client for the lifecycle API: {0}")]
    ClientBuild(reqwest::Error),
    #[error("registration request could not be sent: {0}")]
    RegistrationRequest(reqwest::Error),
    #[error("registration was rejected with status {status}: {body}")]
    RegistrationRejected { status: StatusCode, body: String },
    #[error("registration response did not include a valid extension identifier")]
    MissingIdentifier,
    #[error("next event request failed: {0}")]
    PollRequest(reqwest::Error),
    #[error("next event request was rejected with status {status}: {body}")]
    PollRejected { status: StatusCode, body: String },
    #[error("received a malformed event: {0}")]
    MalformedEvent(#[from] EventParseError),
}

impl ApiError {
    /// Whether this error happened during the one-time registration handshake.
    pub fn is_registration_failure(&self) -> bool {
        matches!(
            self,
            ApiError::RegistrationRequest(_)
                | ApiError::RegistrationRejected { .. }
                | ApiError::MissingIdentifier
        )
    }

    /// Whether this error happened while waiting for the next event.
    pub fn is_poll_failure(&self) -> bool {
        matches!(
            self,
            ApiError::PollRequest(_) | ApiError::PollRejected { .. } | ApiError::MalformedEvent(_)
        )
    }
}
