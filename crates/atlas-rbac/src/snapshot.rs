//! Immutable view of one user's resolved permissions.
//!
//! A snapshot is built once per load and never mutated; the store swaps in
//! a fresh `Arc<PermissionSnapshot>` so readers never see a partial update.

use crate::keys::{FeatureKey, WILDCARD};
use crate::record::{
    canonicalize_role_features, merge_permissions, PermissionRecord, UserOverrideRow,
    UserPermissionsResponse,
};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Enabled modules, merged permission records and role features for one
/// user at one point in time.
#[derive(Debug, Clone, Default)]
pub struct PermissionSnapshot {
    user: Option<UserId>,
    modules: Vec<String>,
    module_set: HashSet<String>,
    permissions: HashMap<FeatureKey, PermissionRecord>,
    order: Vec<FeatureKey>,
    role_features: HashSet<String>,
}

impl PermissionSnapshot {
    /// The no-access state.
    pub fn empty() -> Self {
        Self::default()
    }

    /// No access, but remembering who it belongs to.
    pub fn empty_for(user: Option<UserId>) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    pub fn from_parts(
        user: Option<UserId>,
        modules: impl IntoIterator<Item = String>,
        records: Vec<PermissionRecord>,
        role_features: HashSet<String>,
    ) -> Self {
        let mut snapshot = Self::empty_for(user);

        for module in modules {
            let module = module.trim().to_string();
            if module.is_empty() || snapshot.module_set.contains(&module) {
                continue;
            }
            snapshot.module_set.insert(module.clone());
            snapshot.modules.push(module);
        }

        for record in records {
            if !snapshot.permissions.contains_key(&record.key) {
                snapshot.order.push(record.key.clone());
            }
            snapshot.permissions.insert(record.key.clone(), record);
        }

        snapshot.role_features = role_features;
        snapshot
    }

    /// Build from backend responses, merging overrides onto role rows.
    pub fn from_response(
        user: Option<UserId>,
        response: UserPermissionsResponse,
        overrides: &[UserOverrideRow],
        registry: &Registry,
    ) -> Self {
        let records = merge_permissions(&response.permissions, overrides, registry);
        let role_features = canonicalize_role_features(&response.role_features, registry);
        Self::from_parts(user, response.modules, records, role_features)
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Enabled module keys in backend order.
    pub fn enabled_modules(&self) -> &[String] {
        &self.modules
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.module_set.contains(module)
    }

    /// Records in the order they were first seen.
    pub fn permissions(&self) -> impl Iterator<Item = &PermissionRecord> {
        self.order.iter().filter_map(|k| self.permissions.get(k))
    }

    /// Resolve a bare or canonical key. A bare key is completed with
    /// `module` before the lookup.
    pub fn lookup(&self, key: &str, module: Option<&str>) -> Option<&PermissionRecord> {
        let key = FeatureKey::normalize(key, module);
        self.permissions.get(&key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.permissions.contains_key(key)
    }

    pub fn role_features(&self) -> &HashSet<String> {
        &self.role_features
    }

    pub fn has_role_feature(&self, key: &str) -> bool {
        self.role_features.contains(key)
    }

    /// A wildcard module or permission makes the user super.
    pub fn is_super(&self) -> bool {
        self.module_set.contains(WILDCARD) || self.permissions.contains_key(WILDCARD)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.permissions.is_empty() && self.role_features.is_empty()
    }
}
