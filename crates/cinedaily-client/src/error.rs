//! Error types for backend exchanges.

use thiserror::Error;

/// Primary error type for requests issued against the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the connection failed mid-flight.
    #[error("request failed")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Source transport error.
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body when available.
        detail: Option<String>,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response body")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Decoder error detail.
        detail: String,
    },
    /// A request URL could not be built.
    #[error("invalid request URL")]
    InvalidUrl {
        /// Offending input.
        value: String,
        /// Parser error detail.
        detail: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    HttpClient {
        /// Builder error detail.
        detail: String,
    },
}

impl ClientError {
    /// Operation identifier associated with the failure, when known.
    #[must_use]
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Transport { operation, .. }
            | Self::Status { operation, .. }
            | Self::Decode { operation, .. } => Some(*operation),
            Self::InvalidUrl { .. } | Self::HttpClient { .. } => None,
        }
    }

    /// HTTP status code when the backend answered with an error status.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// One-line description including the operation and any backend detail.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Transport { operation, source } => format!("{operation}: {source}"),
            Self::Status {
                operation,
                status,
                detail: Some(detail),
            } => format!("{operation}: {detail} (status {status})"),
            Self::Status {
                operation,
                status,
                detail: None,
            } => format!("{operation}: request failed with status {status}"),
            Self::Decode { operation, detail } => {
                format!("{operation}: failed to decode response: {detail}")
            }
            Self::InvalidUrl { value, detail } => format!("invalid URL '{value}': {detail}"),
            Self::HttpClient { detail } => format!("failed to build HTTP client: {detail}"),
        }
    }
}

/// Convenience alias for backend results.
pub type ClientResult<T> = Result<T, ClientError>;
