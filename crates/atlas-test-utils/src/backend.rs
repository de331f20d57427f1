//! In-memory permission backend with scripted responses.

use async_trait::async_trait;
use atlas_rbac::backend::{user_overrides_path, PAGE_PERMISSIONS_PATH, USER_PERMISSIONS_PATH};
use atlas_rbac::{
    BackendError, PagePermissions, PermissionBackend, UserOverridesResponse,
    UserPermissionsResponse,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Script {
    permissions: Option<UserPermissionsResponse>,
    overrides: HashMap<String, UserOverridesResponse>,
    fail_overrides: bool,
    pages: HashMap<String, PagePermissions>,
    permissions_gate: Option<Arc<Notify>>,
    page_gate: Option<Arc<Notify>>,
}

/// Backend answering from scripted data.
///
/// Unscripted permissions fail, unscripted overrides are empty, and
/// unscripted pages fail. Gates hold the next call until released.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
    permission_calls: AtomicUsize,
    override_calls: AtomicUsize,
    page_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permissions(self, response: UserPermissionsResponse) -> Self {
        self.set_permissions(Some(response));
        self
    }

    pub fn with_overrides(self, user_id: &str, response: UserOverridesResponse) -> Self {
        self.script.lock().overrides.insert(user_id.to_string(), response);
        self
    }

    pub fn with_page(self, base_path: &str, page: PagePermissions) -> Self {
        self.script.lock().pages.insert(base_path.to_string(), page);
        self
    }

    /// Replace the permissions response; `None` makes the call fail.
    pub fn set_permissions(&self, response: Option<UserPermissionsResponse>) {
        self.script.lock().permissions = response;
    }

    pub fn fail_overrides(&self, fail: bool) {
        self.script.lock().fail_overrides = fail;
    }

    /// Hold the next permissions call until the returned handle is
    /// notified. The response is taken when the call starts.
    pub fn pause_next_permissions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().permissions_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Hold the next page call until the returned handle is notified.
    pub fn pause_next_page(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().page_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn permission_calls(&self) -> usize {
        self.permission_calls.load(Ordering::SeqCst)
    }

    pub fn override_calls(&self) -> usize {
        self.override_calls.load(Ordering::SeqCst)
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionBackend for ScriptedBackend {
    async fn fetch_user_permissions(&self) -> Result<UserPermissionsResponse, BackendError> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        let (response, gate) = {
            let mut script = self.script.lock();
            (script.permissions.clone(), script.permissions_gate.take())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        response.ok_or_else(|| BackendError::Unavailable(USER_PERMISSIONS_PATH.to_string()))
    }

    async fn fetch_user_overrides(&self, user_id: &str) -> Result<UserOverridesResponse, BackendError> {
        self.override_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock();
        if script.fail_overrides {
            return Err(BackendError::Unavailable(user_overrides_path(user_id)));
        }
        Ok(script.overrides.get(user_id).cloned().unwrap_or_default())
    }

    async fn fetch_page_permissions(&self, base_path: &str) -> Result<PagePermissions, BackendError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let (page, gate) = {
            let mut script = self.script.lock();
            (script.pages.get(base_path).copied(), script.page_gate.take())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        page.ok_or_else(|| BackendError::Unavailable(format!("{}?path={}", PAGE_PERMISSIONS_PATH, base_path)))
    }
}
