//! Error types for DNS-01 orchestration
//!
//! This module defines all error types used throughout the crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for DNS-01 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for DNS-01 orchestration
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed domain or challenge input (caller bug)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The DNS vendor rejected a create or delete
    ///
    /// `message` is passed through verbatim from the vendor response.
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Vendor-supplied message
        message: String,
    },

    /// A provider call did not answer within the call timeout
    ///
    /// Unlike [`Error::Provider`], the vendor may still have applied the
    /// change, so a timed-out create is followed by cleanup.
    #[error("Provider {provider} did not answer {operation} within {timeout:?}")]
    ProviderTimeout {
        /// Provider name
        provider: String,
        /// `create_record` or `delete_record`
        operation: &'static str,
        /// The call timeout that expired
        timeout: Duration,
    },

    /// The record was never observed within the propagation timeout
    #[error("TXT record {fqdn} not observed within {timeout:?} ({attempts} checks)")]
    PropagationTimeout {
        /// Record name that was polled
        fqdn: String,
        /// The policy timeout that expired
        timeout: Duration,
        /// Number of checks performed
        attempts: usize,
    },

    /// Transient DNS resolution failure (SERVFAIL, network timeout)
    ///
    /// Produced by resolvers and swallowed by the propagation waiter.
    #[error("DNS resolution error: {0}")]
    Resolution(String),

    /// The operation was aborted by the caller
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a provider call timeout error
    pub fn provider_timeout(
        provider: impl Into<String>,
        operation: &'static str,
        timeout: Duration,
    ) -> Self {
        Self::ProviderTimeout {
            provider: provider.into(),
            operation,
            timeout,
        }
    }

    /// Create a transient resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a retry may succeed without any change on the caller's side
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_is_verbatim() {
        let err = Error::provider("dreamhost", "no_such_zone");
        assert_eq!(err.to_string(), "Provider error (dreamhost): no_such_zone");
    }

    #[test]
    fn only_resolution_errors_are_transient() {
        assert!(Error::resolution("SERVFAIL").is_transient());
        assert!(!Error::provider("x", "y").is_transient());
        assert!(!Error::cancelled("interrupt").is_transient());
    }

    #[test]
    fn provider_timeout_is_not_a_provider_rejection() {
        let err = Error::provider_timeout("dreamhost", "create_record", Duration::from_secs(30));
        assert!(!matches!(err, Error::Provider { .. }));
        assert_eq!(
            err.to_string(),
            "Provider dreamhost did not answer create_record within 30s"
        );
    }
}
