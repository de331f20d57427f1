//! Error types for permission loading and override persistence.
//!
//! Evaluator queries never fail; these errors only surface from the
//! backend, the settings store, and explicit store operations.

use atlas_common_http::HttpError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the permission backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("permission request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: HttpError,
    },

    #[error("backend not configured: {0}")]
    NotConfigured(String),

    #[error("no backend response for {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn http(endpoint: impl Into<String>, source: HttpError) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// HTTP status behind the failure, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Failure reading or writing persisted settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors returned by [`PermissionStore`](crate::PermissionStore) operations.
#[derive(Debug, Error)]
pub enum RbacError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("no signed-in user")]
    NoUser,

    #[error("load for generation {0} was superseded")]
    Superseded(u64),

    #[error("invalid feature key: {0:?}")]
    InvalidKey(String),
}

pub type Result<T, E = RbacError> = std::result::Result<T, E>;
