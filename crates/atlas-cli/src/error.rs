//! CLI error handling.

use std::process::ExitCode;

use atlas_common_config::ConfigError;
use atlas_rbac::{RbacError, SettingsError};
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{message}: {source}")]
    Backend {
        message: String,
        #[source]
        source: RbacError,
    },

    #[error("failed to save settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("{message}")]
    Validation { message: String, hint: Option<String> },

    #[error("unknown {resource_type} '{name}'")]
    NotFound {
        resource_type: &'static str,
        name: String,
        suggestions: Vec<String>,
    },

    #[error("failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn backend(message: impl Into<String>, source: RbacError) -> Self {
        Self::Backend {
            message: message.into(),
            source,
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E001",
            Self::Backend { .. } => "E002",
            Self::Settings(_) => "E003",
            Self::Validation { .. } => "E004",
            Self::NotFound { .. } => "E005",
            Self::Output(_) => "E006",
            Self::Other(_) => "E999",
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        let code = match self {
            Self::Config(_) => 2,
            Self::Settings(_) => 3,
            Self::Backend { .. } => 4,
            Self::Validation { .. } => 5,
            Self::NotFound { .. } => 6,
            Self::Output(_) | Self::Other(_) => 1,
        };
        ExitCode::from(code)
    }

    /// Get hint for this error if available
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Validation { hint, .. } => hint.clone(),
            Self::NotFound { suggestions, .. } if !suggestions.is_empty() => {
                Some(format!("did you mean: {}", suggestions.join(", ")))
            }
            Self::Config(ConfigError::NotFound { .. }) => {
                Some("omit --config to use .atlas/config.yaml or defaults".to_string())
            }
            _ => None,
        }
    }
}
