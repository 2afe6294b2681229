//! Error types for the zonesync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for zonesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the zonesync system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Nameserver backend errors
    #[error("nameserver backend error ({backend}): {message}")]
    Nameserver {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// Proxy backend errors
    #[error("proxy backend error ({backend}): {message}")]
    Proxy {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// Attempt to mutate a record outside the managed service domain.
    ///
    /// This signals a filtering bug in an upstream poller, not a recoverable
    /// runtime condition.
    #[error("refusing to manage \"{domain}\": outside service domain \"{suffix}\"")]
    NotServiceDomain {
        /// The offending domain
        domain: String,
        /// The configured managed suffix
        suffix: String,
    },

    /// A record creation failed mid-batch
    #[error("record creation failed for \"{domain}\": {source}")]
    CreateRecord {
        /// The domain being created
        domain: String,
        /// The underlying backend error
        source: Box<Error>,
    },

    /// A record deletion failed mid-batch
    #[error("record deletion failed for \"{domain}\": {source}")]
    DeleteRecord {
        /// The domain being deleted
        domain: String,
        /// The underlying backend error
        source: Box<Error>,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a nameserver backend error
    pub fn nameserver(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Nameserver {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a proxy backend error
    pub fn proxy(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Proxy {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a service-domain violation error
    pub fn not_service_domain(domain: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::NotServiceDomain {
            domain: domain.into(),
            suffix: suffix.into(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
