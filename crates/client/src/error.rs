//! Client error taxonomy.

use std::sync::Arc;

use reqwest::StatusCode;
use roster_core::ValidationErrors;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response: connection refused, DNS failure, transport error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A request path could not be joined onto the base URL.
    #[error("Invalid request path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The backend answered with a non-success status.
    ///
    /// `body` is whatever text came back, and may be empty.
    #[error("HTTP {status}: {}", body_excerpt(.body))]
    Status { status: StatusCode, body: String },

    /// A request body could not be serialized.
    #[error("Could not encode request body: {0}")]
    Encode(serde_json::Error),

    /// The body was not the JSON the endpoint declares.
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A write that must return a record came back without a body.
    #[error("Empty response body from {0}")]
    EmptyBody(String),

    /// The backend answered an update with a different record.
    #[error("Backend returned record {returned} for update of {requested}")]
    IdMismatch { requested: i64, returned: i64 },

    /// Client-side validation blocked the request before it was sent.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A cached read answered from an identical request in flight. The
    /// failure is shared between every caller that waited on it.
    #[error(transparent)]
    Shared(Arc<ClientError>),

    /// The invalidation channel was closed.
    #[error("Invalidation channel closed")]
    Closed,
}

impl ClientError {
    /// Unwrap an error shared by coalesced reads when this caller holds the
    /// only reference.
    pub(crate) fn from_shared(error: Arc<Self>) -> Self {
        Arc::try_unwrap(error).unwrap_or_else(Self::Shared)
    }

    /// HTTP status of a rejected request, if the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Shared(inner) => inner.status(),
            _ => None,
        }
    }

    /// Whether the request never got a response.
    #[must_use]
    pub fn is_network(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Shared(inner) => inner.is_network(),
            _ => false,
        }
    }

    /// Whether the request was blocked before it was sent.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

fn body_excerpt(body: &str) -> String {
    if body.is_empty() {
        return "(no body)".to_string();
    }
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_looks_through_shared() {
        let error = ClientError::Shared(Arc::new(ClientError::Status {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        }));
        assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
        assert!(!error.is_network());
    }

    #[test]
    fn test_from_shared_unwraps_sole_owner() {
        let error = ClientError::from_shared(Arc::new(ClientError::Closed));
        assert!(matches!(error, ClientError::Closed));

        let shared = Arc::new(ClientError::Closed);
        let _other = Arc::clone(&shared);
        assert!(matches!(
            ClientError::from_shared(shared),
            ClientError::Shared(_)
        ));
    }

    #[test]
    fn test_empty_body_display() {
        let error = ClientError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert_eq!(error.to_string(), "HTTP 500 Internal Server Error: (no body)");
    }
}
