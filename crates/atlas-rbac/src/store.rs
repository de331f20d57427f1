//! The permission store: per-user state, override layers, the page cache,
//! and the load/refresh lifecycle around them.
//!
//! Reads are synchronous and never perform I/O. Writers replace whole
//! values under short-lived locks that are never held across an `.await`.
//!
//! Every load and page fetch captures the store generation when it starts.
//! A user switch or an `rbac_changed` bumps the generation, and a result
//! that arrives for an older generation is dropped.

use crate::action::Action;
use crate::audit::{log_decision, CheckKind};
use crate::backend::PermissionBackend;
use crate::error::{RbacError, Result};
use crate::evaluator::{Decision, EvalContext};
use crate::events::{EventHub, RbacEvent, Subscription};
use crate::keys::FeatureKey;
use crate::overrides::{GlobalOverride, OverrideFlags, SessionOverrides};
use crate::path::base_path_from;
use crate::record::PagePermissions;
use crate::registry::{EntryInfo, Registry};
use crate::settings::SettingsStore;
use crate::snapshot::{PermissionSnapshot, UserId};
use atlas_common_log::spans::{store_span, Timer};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn, Instrument};

#[derive(Debug, Default)]
struct Overrides {
    session: SessionOverrides,
    global: GlobalOverride,
}

#[derive(Debug, Default)]
struct Pages {
    cache: HashMap<String, PagePermissions>,
    pending: HashSet<String>,
}

/// Thread-safe permission state for the signed-in user.
pub struct PermissionStore {
    backend: Arc<dyn PermissionBackend>,
    settings: Arc<dyn SettingsStore>,
    registry: Registry,
    user: RwLock<Option<UserId>>,
    snapshot: RwLock<Arc<PermissionSnapshot>>,
    overrides: RwLock<Overrides>,
    pages: RwLock<Pages>,
    route: RwLock<Option<String>>,
    generation: AtomicU64,
    load_seq: AtomicU64,
    events: EventHub,
    audit: bool,
}

impl PermissionStore {
    /// Create an empty store. Global overrides are read from `settings`.
    pub fn new(
        backend: Arc<dyn PermissionBackend>,
        settings: Arc<dyn SettingsStore>,
        registry: Registry,
    ) -> Self {
        let global = GlobalOverride::load(settings.as_ref());
        debug!(global = ?global.flags(), "permission store created");
        Self {
            backend,
            settings,
            registry,
            user: RwLock::new(None),
            snapshot: RwLock::new(Arc::new(PermissionSnapshot::empty())),
            overrides: RwLock::new(Overrides {
                session: SessionOverrides::new(),
                global,
            }),
            pages: RwLock::new(Pages::default()),
            route: RwLock::new(None),
            generation: AtomicU64::new(0),
            load_seq: AtomicU64::new(0),
            events: EventHub::default(),
            audit: false,
        }
    }

    /// Trace every action and path decision.
    pub fn with_decision_audit(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events = EventHub::new(capacity);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn user(&self) -> Option<UserId> {
        self.user.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The current snapshot. Later loads do not affect the returned value.
    pub fn snapshot(&self) -> Arc<PermissionSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    // Lifecycle

    /// Switch the signed-in user. State resets to no access immediately;
    /// with `Some(user)` a load follows.
    pub async fn set_user(&self, user: Option<UserId>) -> Result<()> {
        let generation = {
            let mut snapshot = self.snapshot.write();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *self.user.write() = user.clone();
            *snapshot = Arc::new(PermissionSnapshot::empty_for(user.clone()));
            generation
        };

        {
            let mut pages = self.pages.write();
            pages.cache.clear();
            pages.pending.clear();
        }
        self.overrides.write().session.clear();
        *self.route.write() = None;

        match user {
            Some(user) => {
                info!(user = %user, generation, "user changed, loading permissions");
                self.load(user, generation).await
            }
            None => {
                info!(generation, "user signed out");
                Ok(())
            }
        }
    }

    /// Reload the current user's permissions.
    pub async fn refresh_permissions(&self) -> Result<()> {
        let user = self.user().ok_or(RbacError::NoUser)?;
        self.load(user, self.generation()).await
    }

    /// Roles or permissions were edited elsewhere: drop cached page
    /// permissions, reload, and emit [`RbacEvent::Changed`].
    pub async fn rbac_changed(&self) -> Result<()> {
        let generation = {
            let _snapshot = self.snapshot.write();
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        {
            let mut pages = self.pages.write();
            pages.cache.clear();
            pages.pending.clear();
        }

        let result = match self.user() {
            Some(user) => self.load(user, generation).await,
            None => Ok(()),
        };
        self.events.emit(RbacEvent::Changed);
        result
    }

    async fn load(&self, user: UserId, generation: u64) -> Result<()> {
        let seq = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let span = store_span(user.as_str(), generation);

        async move {
            let timer = Timer::start("rbac_load");

            let primary = self.backend.fetch_user_permissions().await;
            if self.is_stale(generation, seq) {
                warn!("discarding permissions for a superseded load");
                return Err(RbacError::Superseded(generation));
            }
            let response = match primary {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "permission load failed, resetting to no access");
                    self.install(generation, seq, PermissionSnapshot::empty_for(Some(user)));
                    return Err(e.into());
                }
            };

            let overrides = match self.backend.fetch_user_overrides(user.as_str()).await {
                Ok(response) => response.items,
                Err(e) => {
                    warn!(error = %e, "user override load failed, using role permissions");
                    Vec::new()
                }
            };

            let snapshot =
                PermissionSnapshot::from_response(Some(user), response, &overrides, &self.registry);
            let (modules, permissions) = (snapshot.enabled_modules().len(), snapshot.permissions().count());
            if !self.install(generation, seq, snapshot) {
                warn!("discarding permissions for a superseded load");
                return Err(RbacError::Superseded(generation));
            }

            info!(modules, permissions, overrides = overrides.len(), "permissions loaded");
            timer.finish();
            Ok(())
        }
        .instrument(span)
        .await
    }

    fn is_stale(&self, generation: u64, seq: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
            || self.load_seq.load(Ordering::SeqCst) != seq
    }

    /// Swap in `snapshot` unless a newer load or generation exists.
    fn install(&self, generation: u64, seq: u64, snapshot: PermissionSnapshot) -> bool {
        let mut current = self.snapshot.write();
        if self.is_stale(generation, seq) {
            return false;
        }
        *current = Arc::new(snapshot);
        true
    }

    // Queries

    fn with_ctx<R>(&self, f: impl FnOnce(&EvalContext<'_>) -> R) -> R {
        let snapshot = self.snapshot();
        let overrides = self.overrides.read();
        let pages = self.pages.read();
        let route = self.route.read();
        let ctx = EvalContext {
            snapshot: &snapshot,
            registry: &self.registry,
            session: &overrides.session,
            global: &overrides.global,
            page_cache: &pages.cache,
            route: route.as_deref(),
        };
        f(&ctx)
    }

    pub fn is_module_enabled(&self, module: &str) -> bool {
        self.with_ctx(|ctx| ctx.is_module_enabled(module))
    }

    pub fn is_super(&self) -> bool {
        self.snapshot().is_super()
    }

    pub fn is_feature_enabled(&self, module: &str, feature: &str) -> bool {
        self.with_ctx(|ctx| ctx.is_feature_enabled(module, feature))
    }

    pub fn is_dashboard_enabled(&self, module: &str, dashboard: &str) -> bool {
        self.with_ctx(|ctx| ctx.is_dashboard_enabled(module, dashboard))
    }

    pub fn has_role_feature(&self, key: &str) -> bool {
        self.with_ctx(|ctx| ctx.has_role_feature(key))
    }

    pub fn can_access_feature_key(&self, module: &str, segment: &str) -> bool {
        self.with_ctx(|ctx| ctx.can_access_feature_key(module, segment))
    }

    pub fn can_access_path(&self, path: &str, action: &Action) -> bool {
        self.check_path(path, action).granted
    }

    /// [`Self::can_access_path`] with the deciding layer.
    pub fn check_path(&self, path: &str, action: &Action) -> Decision {
        let decision = self.with_ctx(|ctx| ctx.can_access_path(path, action));
        self.audit(CheckKind::Path, path, action, decision);
        decision
    }

    pub fn can_perform_action(&self, key: &str, action: &Action) -> bool {
        self.check_action(key, action).granted
    }

    /// [`Self::can_perform_action`] with the deciding layer.
    pub fn check_action(&self, key: &str, action: &Action) -> Decision {
        let decision = self.with_ctx(|ctx| ctx.can_perform_action(key, action));
        self.audit(CheckKind::Action, key, action, decision);
        decision
    }

    fn audit(&self, check: CheckKind, subject: &str, action: &Action, decision: Decision) {
        if self.audit {
            let user = self.user();
            log_decision(user.as_ref().map(UserId::as_str), check, subject, action, decision);
        }
    }

    pub fn get_enabled_modules(&self) -> Vec<String> {
        self.with_ctx(|ctx| ctx.enabled_modules())
    }

    pub fn get_enabled_features(&self, module: &str) -> Vec<EntryInfo> {
        self.with_ctx(|ctx| ctx.enabled_features(module))
    }

    pub fn get_enabled_dashboards(&self, module: &str) -> Vec<EntryInfo> {
        self.with_ctx(|ctx| ctx.enabled_dashboards(module))
    }

    pub fn get_disabled_features(&self, module: &str) -> Vec<EntryInfo> {
        self.with_ctx(|ctx| ctx.disabled_features(module))
    }

    // Session and global overrides

    /// Set or clear one session flag. The view/mutation consistency rule
    /// applies.
    pub fn set_action_session_override(
        &self,
        key: &str,
        action: &Action,
        value: Option<bool>,
    ) -> Result<()> {
        let key = FeatureKey::from(key);
        if key.as_str().is_empty() {
            return Err(RbacError::InvalidKey(key.into_string()));
        }
        debug!(key = %key, action = %action, ?value, "session override set");
        self.overrides.write().session.set_action(key, action, value);
        self.events.emit(RbacEvent::Updated);
        Ok(())
    }

    pub fn session_override(&self, key: &str) -> Option<OverrideFlags> {
        self.overrides.read().session.get(key).copied()
    }

    /// Grant `action` as a session override on every feature and
    /// dashboard the user can currently see. Returns how many keys were
    /// granted.
    pub fn grant_all_visible(&self, action: &Action) -> usize {
        let keys: Vec<FeatureKey> = self.with_ctx(|ctx| {
            self.registry
                .modules()
                .iter()
                .flat_map(|module| {
                    ctx.enabled_features(module.key)
                        .into_iter()
                        .chain(ctx.enabled_dashboards(module.key))
                })
                .map(|entry| FeatureKey::from_canonical(entry.canonical_key))
                .collect()
        });

        let count = self.overrides.write().session.grant_all(keys, action);
        info!(action = %action, count, "granted all visible");
        self.events.emit(RbacEvent::Updated);
        count
    }

    pub fn clear_session_overrides(&self) {
        self.overrides.write().session.clear();
        info!("session overrides cleared");
        self.events.emit(RbacEvent::Updated);
    }

    /// Persist a global override. `false` clears the flag.
    pub fn set_global_override(&self, action: &Action, value: bool) -> Result<()> {
        self.overrides
            .write()
            .global
            .set(self.settings.as_ref(), action, value)?;
        self.events.emit(RbacEvent::Updated);
        Ok(())
    }

    pub fn global_override(&self) -> GlobalOverride {
        self.overrides.read().global
    }

    // Page permissions

    pub fn base_path_from(&self, path: &str) -> String {
        base_path_from(path)
    }

    /// Record the route the user is on; `can_perform_action` consults the
    /// page cache for it. Returns the route's base path.
    pub fn enter_route(&self, path: &str) -> String {
        let base = base_path_from(path);
        *self.route.write() = Some(base.clone());
        base
    }

    pub fn current_route(&self) -> Option<String> {
        self.route.read().clone()
    }

    /// Cached page permissions for `path`'s base path. Never fetches.
    pub fn get_page_perms(&self, path: &str) -> Option<PagePermissions> {
        self.pages.read().cache.get(&base_path_from(path)).copied()
    }

    /// Fetch page permissions for `path`'s base path unless cached.
    ///
    /// Returns `Ok(None)` when a fetch for the same base path is already in
    /// flight or the result belonged to an older generation. Failures are
    /// not cached, so a later call retries.
    pub async fn ensure_page_perms(&self, path: &str) -> Result<Option<PagePermissions>> {
        let base = base_path_from(path);
        let generation = {
            let mut pages = self.pages.write();
            if let Some(page) = pages.cache.get(&base) {
                debug!(base = %base, "page permissions cached");
                return Ok(Some(*page));
            }
            if !pages.pending.insert(base.clone()) {
                debug!(base = %base, "page permission fetch already pending");
                return Ok(None);
            }
            self.generation()
        };

        let _pending = PendingGuard {
            store: self,
            base: &base,
            generation,
        };
        let result = self.backend.fetch_page_permissions(&base).await;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!(base = %base, error = %e, "page permission fetch failed");
                return Err(e.into());
            }
        };

        {
            let mut pages = self.pages.write();
            if self.generation() != generation {
                debug!(base = %base, generation, "discarding stale page permissions");
                return Ok(None);
            }
            pages.cache.insert(base.clone(), page);
        }
        debug!(base = %base, ?page, "page permissions cached");
        self.events.emit(RbacEvent::Updated);
        Ok(Some(page))
    }

    /// Set one page flag for `path`'s base path, creating the entry when
    /// absent. The view/mutation consistency rule applies.
    pub fn set_page_override(&self, path: &str, action: &Action, value: bool) -> PagePermissions {
        let base = base_path_from(path);
        let page = {
            let mut pages = self.pages.write();
            let page = pages.cache.entry(base.clone()).or_default();
            page.set(action, value);
            *page
        };
        debug!(base = %base, action = %action, value, "page override set");
        self.events.emit(RbacEvent::Updated);
        page
    }

    // Events

    pub fn subscribe(&self) -> broadcast::Receiver<RbacEvent> {
        self.events.subscribe()
    }

    pub fn on_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(RbacEvent) + Send + Sync + 'static,
    {
        self.events.on_event(callback)
    }
}

impl std::fmt::Debug for PermissionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionStore")
            .field("user", &self.user())
            .field("generation", &self.generation())
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

/// Clears a pending page fetch, including when the fetching future is
/// dropped before completion.
struct PendingGuard<'a> {
    store: &'a PermissionStore,
    base: &'a str,
    generation: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut pages = self.store.pages.write();
        if self.store.generation() == self.generation {
            pages.pending.remove(self.base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockPermissionBackend;
    use crate::error::BackendError;
    use crate::record::{RolePermissionRow, UserOverridesResponse, UserPermissionsResponse};
    use crate::settings::MemorySettings;

    fn sales_response() -> UserPermissionsResponse {
        UserPermissionsResponse {
            modules: vec!["sales".into()],
            permissions: vec![RolePermissionRow {
                module_key: Some("sales".into()),
                feature_key: "customers".into(),
                can_view: Some(true),
                can_create: Some(false),
                ..Default::default()
            }],
            role_features: vec!["sales:customers".into()],
        }
    }

    fn store(backend: MockPermissionBackend) -> PermissionStore {
        PermissionStore::new(Arc::new(backend), Arc::new(MemorySettings::new()), Registry::builtin())
    }

    #[tokio::test]
    async fn test_load_merges_overrides() {
        let mut backend = MockPermissionBackend::new();
        backend
            .expect_fetch_user_permissions()
            .times(1)
            .returning(|| Ok(sales_response()));
        backend
            .expect_fetch_user_overrides()
            .withf(|id| id.to_string() == "u-1")
            .times(1)
            .returning(|_| {
                Ok(UserOverridesResponse {
                    items: vec![crate::record::UserOverrideRow {
                        feature_key: "customers".into(),
                        module_key: Some("sales".into()),
                        can_create: Some(true),
                        ..Default::default()
                    }],
                })
            });

        let store = store(backend);
        store.set_user(Some(UserId::new("u-1"))).await.unwrap();

        assert_eq!(store.get_enabled_modules(), vec!["sales".to_string()]);
        assert!(store.can_perform_action("sales:customers", &Action::Create));
    }

    #[tokio::test]
    async fn test_primary_failure_fails_closed() {
        let mut backend = MockPermissionBackend::new();
        let mut calls = 0;
        backend.expect_fetch_user_permissions().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(sales_response())
            } else {
                Err(BackendError::Unavailable(crate::backend::USER_PERMISSIONS_PATH.into()))
            }
        });
        backend
            .expect_fetch_user_overrides()
            .returning(|_| Ok(UserOverridesResponse::default()));

        let store = store(backend);
        store.set_user(Some(UserId::new("u-1"))).await.unwrap();
        assert!(store.is_module_enabled("sales"));

        assert!(store.refresh_permissions().await.is_err());
        assert!(store.get_enabled_modules().is_empty());
        assert!(!store.can_perform_action("sales:customers", &Action::View));
        assert_eq!(store.user(), Some(UserId::new("u-1")));
    }

    #[tokio::test]
    async fn test_override_failure_fails_soft() {
        let mut backend = MockPermissionBackend::new();
        backend
            .expect_fetch_user_permissions()
            .returning(|| Ok(sales_response()));
        backend
            .expect_fetch_user_overrides()
            .returning(|id| Err(BackendError::Unavailable(crate::backend::user_overrides_path(id))));

        let store = store(backend);
        store.set_user(Some(UserId::new("u-1"))).await.unwrap();
        assert!(store.can_perform_action("sales:customers", &Action::View));
        assert!(!store.can_perform_action("sales:customers", &Action::Create));
    }

    #[tokio::test]
    async fn test_refresh_without_user() {
        let store = store(MockPermissionBackend::new());
        assert!(matches!(store.refresh_permissions().await, Err(RbacError::NoUser)));
    }

    #[tokio::test]
    async fn test_sign_out_resets() {
        let mut backend = MockPermissionBackend::new();
        backend
            .expect_fetch_user_permissions()
            .returning(|| Ok(sales_response()));
        backend
            .expect_fetch_user_overrides()
            .returning(|_| Ok(UserOverridesResponse::default()));

        let store = store(backend);
        store.set_user(Some(UserId::new("u-1"))).await.unwrap();
        store
            .set_action_session_override("sales:customers", &Action::Edit, Some(true))
            .unwrap();
        let before = store.generation();

        store.set_user(None).await.unwrap();
        assert!(store.generation() > before);
        assert!(store.get_enabled_modules().is_empty());
        assert_eq!(store.session_override("sales:customers"), None);
    }

    #[tokio::test]
    async fn test_page_perms_cached_once() {
        let mut backend = MockPermissionBackend::new();
        backend
            .expect_fetch_page_permissions()
            .withf(|base| base.to_string() == "/sales/invoices")
            .times(1)
            .returning(|_| {
                Ok(PagePermissions {
                    can_view: true,
                    ..Default::default()
                })
            });

        let store = store(backend);
        assert_eq!(store.get_page_perms("/sales/invoices/42"), None);

        let page = store.ensure_page_perms("/sales/invoices/42").await.unwrap();
        assert!(page.is_some_and(|p| p.can_view));
        let again = store.ensure_page_perms("/sales/invoices/new").await.unwrap();
        assert_eq!(page, again);
        assert_eq!(store.get_page_perms("/sales/invoices"), page);
    }

    #[tokio::test]
    async fn test_page_fetch_failure_is_retried() {
        let mut backend = MockPermissionBackend::new();
        let mut calls = 0;
        backend.expect_fetch_page_permissions().times(2).returning(move |base| {
            calls += 1;
            if calls == 1 {
                Err(BackendError::Unavailable(base.to_string()))
            } else {
                Ok(PagePermissions::default())
            }
        });

        let store = store(backend);
        assert!(store.ensure_page_perms("/hr/payroll").await.is_err());
        assert_eq!(store.get_page_perms("/hr/payroll"), None);
        assert_eq!(
            store.ensure_page_perms("/hr/payroll").await.unwrap(),
            Some(PagePermissions::default())
        );
    }

    #[tokio::test]
    async fn test_route_page_cache_takes_precedence() {
        let mut backend = MockPermissionBackend::new();
        backend
            .expect_fetch_user_permissions()
            .returning(|| Ok(sales_response()));
        backend
            .expect_fetch_user_overrides()
            .returning(|_| Ok(UserOverridesResponse::default()));

        let store = store(backend);
        store.set_user(Some(UserId::new("u-1"))).await.unwrap();
        store
            .set_action_session_override("sales:customers", &Action::Create, Some(true))
            .unwrap();
        assert!(store.can_perform_action("sales:customers", &Action::Create));

        assert_eq!(store.enter_route("/sales/customers/17"), "/sales/customers");
        store.set_page_override("/sales/customers", &Action::View, true);
        assert!(!store.can_perform_action("sales:customers", &Action::Create));
        assert!(store.can_perform_action("sales:customers", &Action::View));
    }

    #[tokio::test]
    async fn test_grant_all_visible() {
        let mut backend = MockPermissionBackend::new();
        backend
            .expect_fetch_user_permissions()
            .returning(|| Ok(sales_response()));
        backend
            .expect_fetch_user_overrides()
            .returning(|_| Ok(UserOverridesResponse::default()));

        let store = store(backend);
        store.set_user(Some(UserId::new("u-1"))).await.unwrap();

        assert_eq!(store.grant_all_visible(&Action::Delete), 1);
        let flags = store.session_override("sales:customers").unwrap();
        assert_eq!(flags.can_delete, Some(true));
        assert_eq!(flags.can_view, Some(true));
        assert!(store.can_perform_action("sales:customers", &Action::Delete));
    }

    #[tokio::test]
    async fn test_override_mutations_emit_updated() {
        let store = store(MockPermissionBackend::new());
        let mut rx = store.subscribe();

        store.set_global_override(&Action::View, true).unwrap();
        store.clear_session_overrides();

        assert_eq!(rx.recv().await.unwrap(), RbacEvent::Updated);
        assert_eq!(rx.recv().await.unwrap(), RbacEvent::Updated);
        assert_eq!(store.global_override().get(&Action::View), Some(true));
    }

    #[test]
    fn test_invalid_session_key() {
        let store = store(MockPermissionBackend::new());
        let err = store
            .set_action_session_override("  ", &Action::View, Some(true))
            .unwrap_err();
        assert!(matches!(err, RbacError::InvalidKey(_)));
    }
}
