//! Durable key/value settings backing the Global Override layer.
//!
//! Values are plain strings. Flags are stored as `"1"` or `"0"`; any value
//! other than `"1"` reads back as "no flag".

use crate::error::SettingsError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const FLAG_ON: &str = "1";
const FLAG_OFF: &str = "0";

/// Injected storage for settings that must survive restarts.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`; `None` removes the key.
    fn set(&self, key: &str, value: Option<&str>) -> Result<(), SettingsError>;

    /// `Some(true)` only for a stored `"1"`.
    fn get_flag(&self, key: &str) -> Option<bool> {
        match self.get(key).as_deref() {
            Some(FLAG_ON) => Some(true),
            _ => None,
        }
    }

    /// Write a flag as `"1"`/`"0"`, or remove it for `None`.
    fn set_flag(&self, key: &str, value: Option<bool>) -> Result<(), SettingsError> {
        let raw = value.map(|v| if v { FLAG_ON } else { FLAG_OFF });
        self.set(key, raw)
    }
}

/// Settings kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with initial values.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), SettingsError> {
        let mut values = self.values.lock();
        match value {
            Some(v) => values.insert(key.to_string(), v.to_string()),
            None => values.remove(key),
        };
        Ok(())
    }
}

/// Settings persisted as one JSON object on disk.
///
/// Every change rewrites the whole file through a temp file and a rename,
/// so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettings {
    /// Open the settings file at `path`. A missing or unreadable file
    /// starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = Self::read(&path);
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> BTreeMap<String, String> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file yet");
                return BTreeMap::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable settings file, starting empty");
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt settings file, starting empty");
                BTreeMap::new()
            }
        }
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), SettingsError> {
        let mut values = self.values.lock();
        let mut next = values.clone();
        match value {
            Some(v) => next.insert(key.to_string(), v.to_string()),
            None => next.remove(key),
        };
        self.write(&next)?;
        *values = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flag_encoding() {
        let settings = MemorySettings::new();
        settings.set_flag("a", Some(true)).unwrap();
        settings.set_flag("b", Some(false)).unwrap();

        assert_eq!(settings.get("a").as_deref(), Some("1"));
        assert_eq!(settings.get("b").as_deref(), Some("0"));
        assert_eq!(settings.get_flag("a"), Some(true));
        assert_eq!(settings.get_flag("b"), None);
        assert_eq!(settings.get_flag("missing"), None);

        settings.set_flag("a", None).unwrap();
        assert_eq!(settings.get("a"), None);
    }

    #[test]
    fn test_unexpected_value_is_no_flag() {
        let settings = MemorySettings::with_values([("a", "true")]);
        assert_eq!(settings.get_flag("a"), None);
    }

    #[test]
    fn test_file_settings_persist_across_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = FileSettings::open(&path);
        settings.set("atlas.key", Some("1")).unwrap();
        assert!(path.exists());

        let reopened = FileSettings::open(&path);
        assert_eq!(reopened.get("atlas.key").as_deref(), Some("1"));

        reopened.set("atlas.key", None).unwrap();
        assert_eq!(FileSettings::open(&path).get("atlas.key"), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let settings = FileSettings::open(&path);
        assert_eq!(settings.get("anything"), None);

        settings.set("k", Some("v")).unwrap();
        assert_eq!(FileSettings::open(&path).get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let settings = FileSettings::open(dir.path().join("absent.json"));
        assert_eq!(settings.get("k"), None);
        assert!(!settings.path().exists());
    }
}
