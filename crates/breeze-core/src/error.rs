//! Error types for breeze-core

use thiserror::Error;

/// Result type alias for breeze operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the breeze HTTP server
///
/// `Template` and `Bind` are setup-time and should abort startup;
/// everything request-scoped stays inside the connection dispatcher and
/// never surfaces here.
#[derive(Debug, Error)]
pub enum Error {
    /// Route template rejected at registration
    #[error("invalid route template: {0}")]
    Template(#[from] breeze_router::TemplateError),

    /// Listening socket could not be set up
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Handler failure, reported by application code
    #[error("handler error: {0}")]
    Handler(String),
}

impl Error {
    /// Shorthand for handler-side failures.
    pub fn handler(msg: impl Into<String>) -> Self {
        Error::Handler(msg.into())
    }
}
