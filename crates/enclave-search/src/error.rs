//! Error types for the search backend and embedding clients.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the search backend.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The request could not be sent or no response arrived.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The backend answered with a non-success status, or refused a
    /// document inside an otherwise successful batch response.
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A response body did not have the expected shape.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Input values cannot be turned into a valid request body.
    #[error("invalid payload: {message}")]
    Payload { message: String },

    /// The client was configured with an unusable endpoint or option.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// The tenant id is not a valid index name.
    #[error(transparent)]
    Tenant(#[from] enclave_core::Error),
}

impl IndexError {
    /// Returns `true` when the error is transient and the request may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Rejected { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }

    /// Returns `true` when the backend reported the index as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub(crate) fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else if err.is_decode() {
            Self::parse(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

/// Statuses worth retrying: throttling and gateway/availability failures.
pub(crate) fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

/// Convenience alias for search backend results.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Errors raised while computing embeddings.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The request could not be sent, timed out, or no response arrived.
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("embedding provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider response did not have the expected shape.
    #[error("could not parse embedding response: {message}")]
    Parse { message: String },

    /// The provider returned no embedding for the input.
    #[error("embedding provider returned no data")]
    Empty,

    /// The embedder was configured with an unusable endpoint or deployment.
    #[error("invalid embedding configuration: {message}")]
    Config { message: String },
}

impl EmbedError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

/// Convenience alias for embedding results.
pub type EmbedResult<T> = std::result::Result<T, EmbedError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(status: u16) -> IndexError {
        IndexError::Rejected {
            status,
            message: "nope".to_string(),
        }
    }

    #[test]
    fn test_transient_statuses() {
        assert!(rejected(429).is_transient());
        assert!(rejected(503).is_transient());
        assert!(rejected(504).is_transient());
        assert!(!rejected(400).is_transient());
        assert!(!rejected(403).is_transient());
        assert!(!rejected(404).is_transient());
    }

    #[test]
    fn test_parse_and_payload_are_not_transient() {
        assert!(!IndexError::parse("bad body").is_transient());
        assert!(!IndexError::payload("NaN").is_transient());
    }

    #[test]
    fn test_not_found() {
        assert!(rejected(404).is_not_found());
        assert!(!rejected(400).is_not_found());
        assert!(!IndexError::parse("x").is_not_found());
    }

    #[test]
    fn test_tenant_error_is_transparent() {
        let err: IndexError = enclave_core::TenantId::new("BAD").unwrap_err().into();
        assert!(err.to_string().contains("invalid tenant id"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_embed_error_display() {
        let err = EmbedError::Rejected {
            status: 401,
            message: "bad key".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(!err.is_transient());
        assert!(!EmbedError::Empty.is_transient());
    }
}
