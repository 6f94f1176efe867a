//! Error types for notification delivery.

use thiserror::Error;

/// Failure of a single delivery attempt.
///
/// Every variant is retryable from the notifier's point of view; the
/// distinction exists so logs tell connection failures, timeouts, and
/// rejections apart.
#[derive(Debug, Error, Clone)]
pub enum DeliveryError {
    /// Endpoint responded with a status other than 200 OK.
    #[error("endpoint returned HTTP {status}: {body}")]
    HttpStatus {
        /// HTTP status code received.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// Request exceeded the configured timeout.
    #[error("request timed out after {timeout_seconds}s")]
    Timeout {
        /// Configured per-request timeout in seconds.
        timeout_seconds: u64,
    },

    /// Connection could not be established.
    #[error("network error: {message}")]
    Network {
        /// Underlying error description.
        message: String,
    },

    /// Request failed in transit after the connection was established.
    #[error("transport error: {message}")]
    Transport {
        /// Underlying error description.
        message: String,
    },

    /// Payload could not be serialized to JSON.
    #[error("serialization error: {message}")]
    Serialization {
        /// Underlying error description.
        message: String,
    },

    /// Channel could not be constructed from its configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// What was wrong with the configuration.
        message: String,
    },
}

impl DeliveryError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }
}
