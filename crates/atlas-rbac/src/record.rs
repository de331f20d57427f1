//! Permission records, backend row shapes, and the merge of role grants
//! with per-user overrides.
//!
//! Backend rows are normalized exactly once, here. Everything downstream
//! only sees [`PermissionRecord`]s keyed by canonical [`FeatureKey`]s.

use crate::action::Action;
use crate::keys::FeatureKey;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Resolved four-capability grant for one canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub key: FeatureKey,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl PermissionRecord {
    /// A record with every capability set to `value`.
    pub fn uniform(key: FeatureKey, value: bool) -> Self {
        Self {
            key,
            can_view: value,
            can_create: value,
            can_edit: value,
            can_delete: value,
        }
    }

    /// Capability for `action`; unknown actions are never allowed.
    pub fn allows(&self, action: &Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Create => self.can_create,
            Action::Edit => self.can_edit,
            Action::Delete => self.can_delete,
            Action::Other(_) => false,
        }
    }
}

/// Row of `GET /admin/user-permissions` → `permissions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionRow {
    #[serde(default)]
    pub module_key: Option<String>,
    pub feature_key: String,
    #[serde(default)]
    pub can_view: Option<bool>,
    #[serde(default)]
    pub can_create: Option<bool>,
    #[serde(default)]
    pub can_edit: Option<bool>,
    #[serde(default)]
    pub can_delete: Option<bool>,
}

/// Row of `GET /admin/users/{id}/feature-permissions` → `items`.
///
/// Absent capability fields mean "no opinion" and keep the role value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverrideRow {
    pub feature_key: String,
    #[serde(default)]
    pub module_key: Option<String>,
    #[serde(default)]
    pub can_view: Option<bool>,
    #[serde(default)]
    pub can_create: Option<bool>,
    #[serde(default)]
    pub can_edit: Option<bool>,
    #[serde(default)]
    pub can_delete: Option<bool>,
}

/// Body of `GET /admin/user-permissions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissionsResponse {
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<RolePermissionRow>,
    #[serde(default)]
    pub role_features: Vec<String>,
}

/// Body of `GET /admin/users/{id}/feature-permissions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverridesResponse {
    #[serde(default)]
    pub items: Vec<UserOverrideRow>,
}

/// Convert one role row into the canonical shape; absent booleans are false.
pub fn to_canonical_permission(row: &RolePermissionRow) -> PermissionRecord {
    PermissionRecord {
        key: FeatureKey::normalize(&row.feature_key, row.module_key.as_deref()),
        can_view: row.can_view.unwrap_or(false),
        can_create: row.can_create.unwrap_or(false),
        can_edit: row.can_edit.unwrap_or(false),
        can_delete: row.can_delete.unwrap_or(false),
    }
}

fn override_key(row: &UserOverrideRow, registry: &Registry) -> FeatureKey {
    let module = row
        .module_key
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .or_else(|| registry.module_for_feature(row.feature_key.trim()));
    FeatureKey::normalize(&row.feature_key, module)
}

fn apply_override(record: &mut PermissionRecord, row: &UserOverrideRow) {
    if let Some(v) = row.can_view {
        record.can_view = v;
    }
    if let Some(v) = row.can_create {
        record.can_create = v;
    }
    if let Some(v) = row.can_edit {
        record.can_edit = v;
    }
    if let Some(v) = row.can_delete {
        record.can_delete = v;
    }
}

/// Merge per-user overrides onto role permissions by canonical key.
///
/// Order of the role rows is kept, duplicates collapse onto the first
/// position with the last row's values. Override keys with no role
/// baseline are appended as new records.
pub fn merge_permissions(
    role_rows: &[RolePermissionRow],
    overrides: &[UserOverrideRow],
    registry: &Registry,
) -> Vec<PermissionRecord> {
    let mut merged: Vec<PermissionRecord> = Vec::with_capacity(role_rows.len() + overrides.len());
    let mut index: HashMap<FeatureKey, usize> = HashMap::new();

    for row in role_rows {
        if row.feature_key.trim().is_empty() {
            continue;
        }
        let record = to_canonical_permission(row);
        match index.get(&record.key) {
            Some(&i) => merged[i] = record,
            None => {
                index.insert(record.key.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    for row in overrides {
        if row.feature_key.trim().is_empty() {
            continue;
        }
        let key = override_key(row, registry);
        match index.get(&key) {
            Some(&i) => apply_override(&mut merged[i], row),
            None => {
                let mut record = PermissionRecord::uniform(key.clone(), false);
                apply_override(&mut record, row);
                index.insert(key, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

/// Canonical role feature keys. Bare entries take their module from the
/// registry, the same way override rows do; blanks are dropped.
pub fn canonicalize_role_features(features: &[String], registry: &Registry) -> HashSet<String> {
    features
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(|f| FeatureKey::normalize(f, registry.module_for_feature(f)).into_string())
        .collect()
}

/// Per-page permission flags, cached by base path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePermissions {
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl PagePermissions {
    pub fn allows(&self, action: &Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Create => self.can_create,
            Action::Edit => self.can_edit,
            Action::Delete => self.can_delete,
            Action::Other(_) => false,
        }
    }

    /// Set one capability, keeping view consistent with the others.
    pub fn set(&mut self, action: &Action, value: bool) {
        match action {
            Action::View => {
                self.can_view = value;
                if !value {
                    self.can_create = false;
                    self.can_edit = false;
                    self.can_delete = false;
                }
            }
            Action::Create => self.can_create = value,
            Action::Edit => self.can_edit = value,
            Action::Delete => self.can_delete = value,
            Action::Other(_) => return,
        }
        if value && action.is_mutation() {
            self.can_view = true;
        }
    }
}
