//! Dispatch outcomes and their aggregate
//!
//! One `DispatchOutcome` per (ingestion call x destination). Outcomes live for
//! the duration of one call and are reduced to a `DispatchSummary`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::DestinationId;

/// Destination-scoped failure. Absorbed into the aggregate, never returned
/// to the ingestion caller.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchFailure {
    /// Destination configured with a verb outside the enumeration
    #[error("unsupported http method '{method}'")]
    UnsupportedMethod { method: String },

    /// Header name or value is not valid header content
    #[error("invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },

    /// Target URL does not parse as an absolute URL
    #[error("invalid url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Payload could not be encoded for this destination
    #[error("payload encoding failed: {message}")]
    Encoding { message: String },

    /// No response within the per-call timeout
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection refused, DNS, TLS, reset...
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The dispatch unit itself died before settling
    #[error("dispatch aborted: {message}")]
    Aborted { message: String },
}

impl DispatchFailure {
    /// Failed before any network call was attempted
    pub fn is_adaptation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMethod { .. }
                | Self::InvalidHeader { .. }
                | Self::InvalidUrl { .. }
                | Self::Encoding { .. }
        )
    }

    /// Deadline elapsed; milliseconds saturate at `u64::MAX`
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnsupportedMethod { .. } => "unsupported_method",
            Self::InvalidHeader { .. } => "invalid_header",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Encoding { .. } => "encoding",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::Aborted { .. } => "aborted",
        }
    }
}

/// How one dispatch unit settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The HTTP exchange completed with this upstream status
    Completed { status: u16 },
    /// Adaptation or transport failure
    Failed { failure: DispatchFailure },
}

/// Result of forwarding to one destination within a dispatch wave
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub destination_id: DestinationId,
    pub kind: OutcomeKind,
}

impl DispatchOutcome {
    pub fn completed(destination_id: DestinationId, status: u16) -> Self {
        Self {
            destination_id,
            kind: OutcomeKind::Completed { status },
        }
    }

    pub fn failed(destination_id: DestinationId, failure: DispatchFailure) -> Self {
        Self {
            destination_id,
            kind: OutcomeKind::Failed { failure },
        }
    }

    /// Upstream status, if the exchange completed
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            OutcomeKind::Completed { status } => Some(status),
            OutcomeKind::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&DispatchFailure> {
        match &self.kind {
            OutcomeKind::Completed { .. } => None,
            OutcomeKind::Failed { failure } => Some(failure),
        }
    }

    /// Whether this outcome counts as a successful forward under `policy`
    pub fn is_success(&self, policy: StatusPolicy) -> bool {
        match self.kind {
            OutcomeKind::Completed { status } => policy.accepts(status),
            OutcomeKind::Failed { .. } => false,
        }
    }
}

/// Whether a non-2xx upstream status still counts as a successful forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Any completed HTTP exchange is a success (best-effort relay)
    #[default]
    AnyResponse,
    /// Only 2xx responses are a success
    SuccessOnly,
}

impl StatusPolicy {
    pub fn accepts(self, status: u16) -> bool {
        match self {
            StatusPolicy::AnyResponse => true,
            StatusPolicy::SuccessOnly => (200..300).contains(&status),
        }
    }
}

/// Aggregate of one dispatch wave
///
/// Invariant: `successful + failed == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    #[serde(rename = "totalDestinations")]
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}
