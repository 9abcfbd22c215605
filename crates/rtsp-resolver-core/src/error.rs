//! Error types for the resolver system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the resolver system
#[derive(Error, Debug)]
pub enum Error {
    /// Address could not be parsed or uses an unsupported scheme
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Connection or file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No definitive answer before the deadline
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The stream server answered with an error status
    #[error("Protocol error: {status} {reason}")]
    Protocol {
        /// Status code returned by the server
        status: u16,
        /// Reason phrase returned by the server
        reason: String,
    },

    /// The server response could not be parsed
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Too many redirects were followed
    #[error("Redirect limit of {0} exceeded")]
    RedirectLimit(usize),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading/writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP client errors (remote source lists)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an invalid address error
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    /// Create a protocol error from a status line
    pub fn protocol(status: u16, reason: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            reason: reason.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error was caused by bad input rather than the network
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress(_) | Self::Json(_) | Self::Csv(_) | Self::Config(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
