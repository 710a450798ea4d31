//! Error types for sheet2xml.
//!
//! Library crates use [`Sheet2XmlError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all sheet2xml operations.
#[derive(Debug, thiserror::Error)]
pub enum Sheet2XmlError {
    /// Configuration loading or validation error. Raised before any I/O.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP failure (connect, TLS, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Service-account signing or token exchange failure.
    #[error("auth error: {0}")]
    Auth(String),

    /// A remote endpoint answered with a non-success status.
    #[error("fetch error: {url}: HTTP {status}: {message}")]
    Fetch {
        url: String,
        status: u16,
        message: String,
    },

    /// Data validation error (malformed sheet, bad key file, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// XML serialization error.
    #[error("xml error: {0}")]
    Xml(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, Sheet2XmlError>;

impl Sheet2XmlError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was raised by configuration validation.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
