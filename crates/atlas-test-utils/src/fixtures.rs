//! Backend rows and ready-made stores.

use crate::backend::ScriptedBackend;
use atlas_rbac::{
    MemorySettings, PermissionStore, Registry, RolePermissionRow, SettingsStore,
    UserOverrideRow, UserOverridesResponse, UserPermissionsResponse,
};
use std::sync::Arc;

/// Role row with explicit capabilities, in `[view, create, edit, delete]`
/// order.
pub fn role_row(module: &str, feature: &str, caps: [bool; 4]) -> RolePermissionRow {
    RolePermissionRow {
        module_key: Some(module.to_string()),
        feature_key: feature.to_string(),
        can_view: Some(caps[0]),
        can_create: Some(caps[1]),
        can_edit: Some(caps[2]),
        can_delete: Some(caps[3]),
    }
}

/// Override row touching only the capabilities that are `Some`.
pub fn override_row(
    module: Option<&str>,
    feature: &str,
    caps: [Option<bool>; 4],
) -> UserOverrideRow {
    UserOverrideRow {
        feature_key: feature.to_string(),
        module_key: module.map(String::from),
        can_view: caps[0],
        can_create: caps[1],
        can_edit: caps[2],
        can_delete: caps[3],
    }
}

pub fn permissions_response(
    modules: &[&str],
    permissions: Vec<RolePermissionRow>,
    role_features: &[&str],
) -> UserPermissionsResponse {
    UserPermissionsResponse {
        modules: modules.iter().map(|m| m.to_string()).collect(),
        permissions,
        role_features: role_features.iter().map(|f| f.to_string()).collect(),
    }
}

pub fn overrides_response(items: Vec<UserOverrideRow>) -> UserOverridesResponse {
    UserOverridesResponse { items }
}

/// Role with module `sales` and `sales:customers` viewable but not
/// creatable.
pub fn sales_viewer() -> UserPermissionsResponse {
    permissions_response(
        &["sales"],
        vec![role_row("sales", "customers", [true, false, false, false])],
        &["sales:customers"],
    )
}

/// A super user through the wildcard module.
pub fn super_user() -> UserPermissionsResponse {
    permissions_response(&["*"], Vec::new(), &[])
}

/// Store over `backend` with in-memory settings.
pub fn store_with(backend: ScriptedBackend) -> (Arc<ScriptedBackend>, PermissionStore) {
    store_with_settings(backend, Arc::new(MemorySettings::new()))
}

pub fn store_with_settings(
    backend: ScriptedBackend,
    settings: Arc<dyn SettingsStore>,
) -> (Arc<ScriptedBackend>, PermissionStore) {
    let backend = Arc::new(backend);
    let store = PermissionStore::new(backend.clone(), settings, Registry::builtin());
    (backend, store)
}
