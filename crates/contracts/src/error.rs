//! Layered error definitions
//!
//! Categorized by scope: config / call / directory.
//! Destination-scoped failures live in [`crate::DispatchFailure`] and never
//! surface as a `ContractError`.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Call-scoped Errors =====
    /// Bearer token absent or unknown. Both cases are deliberately the same variant.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Wrong method, content type or body shape on the ingestion call
    #[error("malformed request: {message}")]
    MalformedRequest { message: String },

    // ===== Directory Errors =====
    /// Directory backend failed to answer
    #[error("directory error: {message}")]
    Directory { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal fault
    #[error("internal error: {0}")]
    Internal(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create malformed request error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
        }
    }

    /// Create directory error
    pub fn directory(message: impl Into<String>) -> Self {
        Self::Directory {
            message: message.into(),
        }
    }

    /// Whether the error is the caller's fault (4xx) rather than ours (5xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::MalformedRequest { .. })
    }
}
