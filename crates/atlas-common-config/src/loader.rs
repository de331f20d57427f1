//! Configuration file loading and parsing.

use crate::env::{vars, Environment};
use crate::types::AtlasConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory holding project-local Atlas state.
pub const CONFIG_DIR: &str = ".atlas";
/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.yaml";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given project directory.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: project_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the config file this loader reads.
    pub fn config_path(&self) -> PathBuf {
        self.base_path.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load configuration from `.atlas/config.yaml`, falling back to defaults.
    ///
    /// `ATLAS_API_URL` and `ATLAS_API_TOKEN` override the file.
    pub fn load(&self) -> Result<AtlasConfig, ConfigError> {
        let config_path = self.config_path();

        let mut config = if config_path.exists() {
            Self::read_file(&config_path)?
        } else {
            AtlasConfig::default()
        };

        apply_env_overrides(&mut config);
        validate(&config)?;
        Ok(config)
    }

    /// Load an explicit config file. Missing files are an error here.
    pub fn load_file(path: impl AsRef<Path>) -> Result<AtlasConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut config = Self::read_file(path)?;
        apply_env_overrides(&mut config);
        validate(&config)?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<AtlasConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&contents)?;

        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })
    }

    /// Save configuration to file.
    pub fn save(&self, config: &AtlasConfig) -> Result<(), ConfigError> {
        let config_dir = self.base_path.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(config_dir.join(CONFIG_FILE), yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
pub fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").map_err(|e| {
        ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        }
    })?;

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let Some(full_match) = cap.get(0) else { continue };
        let var_name = &cap[1];
        let default = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) => v,
            Err(_) => match default {
                Some(d) => d.to_string(),
                None => {
                    return Err(ConfigError::EnvVarNotFound {
                        var: var_name.to_string(),
                    })
                }
            },
        };

        result = result.replace(full_match.as_str(), &value);
    }

    Ok(result)
}

/// Apply `ATLAS_API_URL`, `ATLAS_API_TOKEN` and `ATLAS_SETTINGS_PATH` on
/// top of a loaded config.
pub fn apply_env_overrides(config: &mut AtlasConfig) {
    if let Some(url) = Environment::get(vars::ATLAS_API_URL) {
        config.api.base_url = url;
    }
    if let Some(token) = Environment::get(vars::ATLAS_API_TOKEN) {
        config.api.token = Some(token);
    }
    if let Some(path) = Environment::get(vars::ATLAS_SETTINGS_PATH) {
        config.storage.settings_path = PathBuf::from(path);
    }
}

/// Validate configuration values.
pub fn validate(config: &AtlasConfig) -> Result<(), ConfigError> {
    if config.api.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            message: "api.base_url must not be empty".to_string(),
        });
    }

    if let Err(e) = url::Url::parse(&config.api.base_url) {
        return Err(ConfigError::ValidationError {
            message: format!("api.base_url is not a valid URL: {}", e),
        });
    }

    if config.api.connect_timeout_secs == 0 || config.api.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            message: "api timeouts must be greater than 0".to_string(),
        });
    }

    if config.rbac.event_capacity == 0 {
        return Err(ConfigError::ValidationError {
            message: "rbac.event_capacity must be greater than 0".to_string(),
        });
    }

    Ok(())
}
