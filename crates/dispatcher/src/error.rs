//! Dispatcher error types
//!
//! Only construction can fail. A running wave never returns an error: every
//! destination-scoped problem is folded into its `DispatchOutcome`.

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// HTTP client could not be built
    #[error("failed to initialize http transport: {message}")]
    TransportInit { message: String },
}

impl DispatcherError {
    /// Create a transport initialization error
    pub fn transport_init(message: impl Into<String>) -> Self {
        Self::TransportInit {
            message: message.into(),
        }
    }
}
