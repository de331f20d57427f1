//! Configuration types for Atlas.
//!
//! This crate provides the configuration used by the Atlas front-end core,
//! read from `.atlas/config.yaml` files.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_sensible_values() {
        let config = AtlasConfig::default();

        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert!(config.api.token.is_none());
        assert_eq!(config.api.connect_timeout().as_secs(), 10);
        assert_eq!(config.api.request_timeout().as_secs(), 30);

        assert_eq!(
            config.storage.settings_path,
            std::path::PathBuf::from(".atlas/settings.json")
        );

        assert!(!config.rbac.audit_decisions);
        assert_eq!(config.rbac.event_capacity, 64);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_config_serializes_to_yaml() {
        let config = AtlasConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();

        assert!(yaml.contains("api:"));
        assert!(yaml.contains("storage:"));
        assert!(yaml.contains("rbac:"));
        assert!(yaml.contains("event_capacity: 64"));
        // No token unless one is configured
        assert!(!yaml.contains("token"));
    }

    #[test]
    fn test_partial_configs_merge_with_defaults() {
        let partial_yaml = r#"
rbac:
  audit_decisions: true
"#;

        let config: AtlasConfig = serde_yaml::from_str(partial_yaml).unwrap();

        assert!(config.rbac.audit_decisions);
        assert_eq!(config.rbac.event_capacity, 64);
        assert_eq!(config.api.request_timeout_secs, 30);
    }
}
