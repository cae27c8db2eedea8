//! Application error types

use thiserror::Error;

/// Errors reported by backend collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The call timed out.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The backend could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response text or reason.
        message: String,
    },

    /// The backend envelope carried a failure code.
    #[error("backend rejected the call (code {code}): {message}")]
    Rejected {
        /// Envelope code.
        code: i64,
        /// Envelope message.
        message: String,
    },

    /// The response could not be decoded.
    #[error("could not decode backend response: {0}")]
    Decode(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Returns true if the backend looks unreachable rather than unhappy.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection(_))
    }
}

/// Result type alias for collaborator calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Failure to load the full definition behind a tab.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HydrationError {
    /// The interface no longer exists.
    #[error("interface {0} was not found")]
    NotFound(i64),

    /// The detail call failed.
    #[error("could not load interface {id}: {source}")]
    Backend {
        /// Interface id.
        id: i64,
        /// Underlying failure.
        source: BackendError,
    },
}

impl HydrationError {
    /// Classifies a detail-call failure.
    #[must_use]
    pub fn from_backend(id: i64, error: BackendError) -> Self {
        match error {
            BackendError::NotFound(_) => Self::NotFound(id),
            source => Self::Backend { id, source },
        }
    }
}

/// Failure to persist a draft.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("save failed: {0}")]
pub struct SaveError(#[from] pub BackendError);

/// Failure to load environments for an endpoint key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not load environments for '{endpoint_key}': {source}")]
pub struct EnvironmentLoadError {
    /// Endpoint key that was being resolved.
    pub endpoint_key: String,
    /// Underlying failure.
    pub source: BackendError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn not_found_detail_maps_to_hydration_not_found() {
        let error = HydrationError::from_backend(42, BackendError::NotFound("42".into()));
        assert_eq!(error, HydrationError::NotFound(42));
        assert_eq!(error.to_string(), "interface 42 was not found");
    }

    #[test]
    fn transport_errors_are_flagged() {
        assert!(BackendError::Timeout { timeout_ms: 10 }.is_transport());
        assert!(!BackendError::Decode("x".into()).is_transport());
    }
}
