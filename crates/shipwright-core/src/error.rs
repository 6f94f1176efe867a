//! Error types for domain validation.
//!
//! Covers request validation, commit identifier checks, data-URI decoding,
//! and evaluation-report invariants. Each variant carries enough context for
//! a sanitized client-facing detail message.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for domain validation failures.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// A request field failed semantic validation.
    #[error("invalid field '{field}': {message}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// What constraint was violated
        message: String,
    },

    /// Round number outside the supported range.
    #[error("invalid round {value}: must be 1 or 2")]
    InvalidRound {
        /// The rejected round value
        value: u8,
    },

    /// Commit identifier is not 40 lowercase hex characters.
    #[error("invalid commit sha '{value}': expected 40 hex characters")]
    InvalidCommitSha {
        /// The rejected commit identifier
        value: String,
    },

    /// Attachment data URI could not be parsed or decoded.
    #[error("invalid data URI: {message}")]
    InvalidDataUri {
        /// What made the URI unparseable
        message: String,
    },

    /// Evaluation report URL does not reference the hosting provider.
    #[error("report URL '{url}' is not a hosting-provider URL")]
    InvalidReportUrl {
        /// The rejected URL
        url: String,
    },
}

impl CoreError {
    /// Creates a field validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }
}
