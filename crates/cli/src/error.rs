//! Error types for CLI operations.

use std::net::SocketAddr;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Directory could not be seeded from the configuration
    #[error("Failed to seed directory: {0}")]
    Directory(#[from] directory::DirectoryError),

    /// Relay components could not be assembled
    #[error("Failed to assemble relay: {message}")]
    Startup { message: String },

    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup {
            message: message.into(),
        }
    }

    pub fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind { addr, source }
    }
}

impl From<dispatcher::DispatcherError> for CliError {
    fn from(err: dispatcher::DispatcherError) -> Self {
        Self::startup(err.to_string())
    }
}

impl From<ingestion::IngestError> for CliError {
    fn from(err: ingestion::IngestError) -> Self {
        Self::startup(err.to_string())
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
