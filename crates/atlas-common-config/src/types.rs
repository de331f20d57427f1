//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// REST backend configuration.
    pub api: ApiConfig,
    /// Durable local state.
    pub storage: StorageConfig,
    /// Permission engine configuration.
    pub rbac: RbacConfig,
}

/// REST backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the ERP REST API.
    pub base_url: String,
    /// Bearer token (loaded from env if not set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Custom user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            token: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Durable local state configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File holding persisted settings such as global permission overrides.
    pub settings_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from(".atlas/settings.json"),
        }
    }
}

/// Permission engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Trace every authorization decision.
    pub audit_decisions: bool,
    /// Buffer size of the change/update event channel.
    pub event_capacity: usize,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            audit_decisions: false,
            event_capacity: 64,
        }
    }
}
