//! Canonical `module:feature` keys.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Wildcard grant: a module or permission entry with this key makes the
/// holder a super user.
pub const WILDCARD: &str = "*";

/// Separator between module and feature in a canonical key.
pub const SEPARATOR: char = ':';

/// Canonical feature or dashboard key, `<module_key>:<feature_key>`.
///
/// The wildcard `*` is the only key that is valid without a separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureKey(String);

impl FeatureKey {
    /// Build the canonical key for `key` inside `module`.
    ///
    /// Keys that already carry a separator, and the wildcard, are kept as-is.
    pub fn canonical(module: &str, key: &str) -> Self {
        let key = key.trim();
        if key == WILDCARD || key.contains(SEPARATOR) || module.trim().is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}{}{}", module.trim(), SEPARATOR, key))
        }
    }

    /// Normalize a raw backend key, using `module` when the key is bare.
    ///
    /// A bare key without a module stays bare; it will never match a
    /// canonical grant.
    pub fn normalize(raw: &str, module: Option<&str>) -> Self {
        match module {
            Some(module) => Self::canonical(module, raw),
            None => Self(raw.trim().to_string()),
        }
    }

    /// Wrap a string that is already canonical.
    pub fn from_canonical(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn wildcard() -> Self {
        Self(WILDCARD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == WILDCARD
    }

    pub fn is_canonical(&self) -> bool {
        self.split().is_some()
    }

    /// Module part of a canonical key.
    pub fn module(&self) -> Option<&str> {
        self.split().map(|(m, _)| m)
    }

    /// Feature part of a canonical key.
    pub fn feature(&self) -> Option<&str> {
        self.split().map(|(_, f)| f)
    }

    fn split(&self) -> Option<(&str, &str)> {
        let (module, feature) = self.0.split_once(SEPARATOR)?;
        if module.is_empty() || feature.is_empty() {
            return None;
        }
        Some((module, feature))
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FeatureKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FeatureKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureKey {
    fn from(key: &str) -> Self {
        Self(key.trim().to_string())
    }
}
