//! Directory error types

use thiserror::Error;

/// Directory-specific errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Referenced record does not exist
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// Uniqueness constraint violated
    #[error("{message}")]
    Conflict { message: String },

    /// Missing or malformed field
    #[error("{message}")]
    Invalid { message: String },
}

impl DirectoryError {
    pub fn account_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Account",
            id: id.into(),
        }
    }

    pub fn destination_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Destination",
            id: id.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
