//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The provided URL is invalid or malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A tab identifier could not be parsed.
    #[error("invalid tab id: {0}")]
    InvalidTabId(String),

    /// A draft could not be serialized into its signature form.
    #[error("draft serialization failed: {0}")]
    Signature(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
