//! RelayBlueprint - Config Loader output
//!
//! Describes the whole relay: listener, dispatch tuning, and the seed data
//! for the in-memory directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::StatusPolicy;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Full relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RelayBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchConfig,

    /// Accounts seeded into the directory at startup
    #[serde(default)]
    #[validate(nested)]
    pub accounts: Vec<AccountSeed>,

    /// Destinations seeded into the directory at startup
    #[serde(default)]
    #[validate(nested)]
    pub destinations: Vec<DestinationSeed>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Path of the ingestion endpoint
    #[serde(default = "default_ingest_path")]
    #[validate(custom(function = "validate_route_path"))]
    pub ingest_path: String,

    /// Header carrying the bearer token
    #[serde(default = "default_token_header")]
    #[validate(length(min = 1))]
    pub token_header: String,

    /// Prometheus exporter port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            ingest_path: default_ingest_path(),
            token_header: default_token_header(),
            metrics_port: None,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_ingest_path() -> String {
    "/server/incoming_data".to_string()
}

fn default_token_header() -> String {
    "cl-x-token".to_string()
}

fn validate_route_path(path: &str) -> Result<(), ValidationError> {
    if path.starts_with('/') && path.len() > 1 {
        Ok(())
    } else {
        Err(ValidationError::new("route_path")
            .with_message("path must start with '/' and not be the root".into()))
    }
}

/// Fan-out tuning
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// Per outbound call timeout
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,

    /// Whether non-2xx responses count as successful forwards
    #[serde(default)]
    pub status_policy: StatusPolicy,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            status_policy: StatusPolicy::default(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    concat!("fanout-relay/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Account seed; missing id and token are generated on load
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AccountSeed {
    #[serde(default)]
    pub account_id: Option<String>,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub account_name: String,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub app_secret_token: Option<String>,

    #[serde(default)]
    pub website: Option<String>,
}

/// Destination seed
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DestinationSeed {
    /// Explicit id; allocated when absent
    #[serde(default)]
    pub id: Option<u64>,

    pub account_id: String,

    #[validate(url)]
    pub url: String,

    pub http_method: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}
