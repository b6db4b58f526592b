//! Error types for DNS tracking
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for DNS tracking
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing arguments (fatal before any tracker starts)
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Record type other than A or SRV
    #[error("DNS-Type {0} is not supported")]
    UnsupportedType(String),

    /// Lookup against a single nameserver failed
    ///
    /// NXDOMAIN is not an error: it resolves to an empty record set.
    #[error("Resolution of {name} @{server} failed: {message}")]
    Resolution {
        /// Nameserver that was queried
        server: String,
        /// Queried name
        name: String,
        /// Error text from the resolver
        message: String,
    },

    /// Export sink could not be opened or written
    #[error("Export error: {0}")]
    Export(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an argument error
    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    /// Create an unsupported record type error
    pub fn unsupported_type(record_type: impl Into<String>) -> Self {
        Self::UnsupportedType(record_type.into())
    }

    /// Create a resolution error for one server/query pair
    pub fn resolution(
        server: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            server: server.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an export error
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error must stop the process before tracking starts
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Self::Argument(_) | Self::UnsupportedType(_) | Self::Config(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
