//! Permission decisions.
//!
//! Every function here is pure over an [`EvalContext`]: no I/O, no locking,
//! no mutation. Malformed input (empty keys, empty segments) is denied
//! rather than reported as an error.
//!
//! `can_perform_action` consults the layers in a fixed order and stops at
//! the first one with a definite answer:
//!
//! 1. super user (wildcard grant)
//! 2. page-cache entry for the current route's base path
//! 3. session override for the key
//! 4. global override for the action
//! 5. the merged permission record, or deny when there is none

use crate::action::Action;
use crate::keys::FeatureKey;
use crate::overrides::{GlobalOverride, SessionOverrides};
use crate::path::segments;
use crate::record::PagePermissions;
use crate::registry::{EntryInfo, Registry};
use crate::snapshot::PermissionSnapshot;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

const HOME_MODULE: &str = "home";
const DASHBOARD_SEGMENT: &str = "dashboard";
const PURCHASE_MODULE: &str = "purchase";
const PURCHASE_ALIASES: [&str; 2] = ["direct-purchase", "direct-purchases"];

/// Layer that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Super,
    PageCache,
    SessionOverride,
    GlobalOverride,
    Baseline,
    Denied,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Super => "super",
            Layer::PageCache => "page_cache",
            Layer::SessionOverride => "session_override",
            Layer::GlobalOverride => "global_override",
            Layer::Baseline => "baseline",
            Layer::Denied => "denied",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a check, with the layer that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub granted: bool,
    pub layer: Layer,
}

impl Decision {
    pub fn new(granted: bool, layer: Layer) -> Self {
        Self { granted, layer }
    }

    pub fn deny() -> Self {
        Self::new(false, Layer::Denied)
    }
}

/// Everything a decision reads, borrowed from the store.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub snapshot: &'a PermissionSnapshot,
    pub registry: &'a Registry,
    pub session: &'a SessionOverrides,
    pub global: &'a GlobalOverride,
    pub page_cache: &'a HashMap<String, PagePermissions>,
    /// Base path of the route the user is on, if any.
    pub route: Option<&'a str>,
}

impl<'a> EvalContext<'a> {
    /// True when `module` is in the enabled module set.
    ///
    /// Unlike a plain membership test, the wildcard module `*` also enables
    /// every module, so super users pass module checks.
    pub fn is_module_enabled(&self, module: &str) -> bool {
        let module = module.trim();
        !module.is_empty()
            && (self.snapshot.has_module(module) || self.snapshot.has_module(crate::keys::WILDCARD))
    }

    pub fn is_super(&self) -> bool {
        self.snapshot.is_super()
    }

    /// Visibility of a feature: a record for its canonical key exists.
    pub fn is_feature_enabled(&self, module: &str, feature: &str) -> bool {
        if feature.trim().is_empty() || !self.is_module_enabled(module) {
            return false;
        }
        if self.is_super() {
            return true;
        }
        let key = FeatureKey::canonical(module, feature);
        self.snapshot.contains_key(key.as_str())
    }

    /// Same rule as [`Self::is_feature_enabled`], for dashboard keys.
    pub fn is_dashboard_enabled(&self, module: &str, dashboard: &str) -> bool {
        self.is_feature_enabled(module, dashboard)
    }

    pub fn has_role_feature(&self, key: &str) -> bool {
        let key = key.trim();
        !key.is_empty() && (self.is_super() || self.snapshot.has_role_feature(key))
    }

    /// Role-feature check for one path segment of a module.
    ///
    /// In `purchase`, `direct-purchase` and `direct-purchases` are the same
    /// feature: a grant on either satisfies both.
    pub fn can_access_feature_key(&self, module: &str, segment: &str) -> bool {
        let (module, segment) = (module.trim(), segment.trim());
        if module.is_empty() || segment.is_empty() {
            return false;
        }
        if self.is_super() {
            return true;
        }
        if !self.is_module_enabled(module) {
            return false;
        }
        if module == PURCHASE_MODULE && PURCHASE_ALIASES.contains(&segment) {
            return PURCHASE_ALIASES
                .iter()
                .any(|alias| self.role_feature_granted(module, alias));
        }
        self.role_feature_granted(module, segment)
    }

    fn role_feature_granted(&self, module: &str, segment: &str) -> bool {
        let key = FeatureKey::canonical(module, segment);
        self.snapshot.has_role_feature(key.as_str())
    }

    /// Route-level access for a raw URL path.
    ///
    /// The decision depends on the path alone: module roots follow module
    /// enablement, second segments the registry does not know are allowed,
    /// and known segments need a role-feature grant. `action` does not
    /// narrow it; per-page action limits belong to [`Self::can_perform_action`].
    pub fn can_access_path(&self, path: &str, _action: &Action) -> Decision {
        if self.is_super() {
            return Decision::new(true, Layer::Super);
        }
        self.path_visibility(path)
    }

    fn path_visibility(&self, path: &str) -> Decision {
        let segs = segments(path);
        let (module, rest) = match segs.as_slice() {
            [] => return Decision::new(true, Layer::Baseline),
            [only] if *only == DASHBOARD_SEGMENT => return Decision::new(true, Layer::Baseline),
            [module, rest @ ..] => (*module, rest),
        };

        if self.global.get(&Action::View) == Some(true) {
            return Decision::new(true, Layer::GlobalOverride);
        }

        if module == HOME_MODULE {
            return match rest.first() {
                None => Decision::new(true, Layer::Baseline),
                Some(segment) => {
                    let granted = self.role_feature_granted(HOME_MODULE, segment);
                    Decision::new(granted, if granted { Layer::Baseline } else { Layer::Denied })
                }
            };
        }

        if !self.is_module_enabled(module) {
            return Decision::deny();
        }

        let Some(segment) = rest.first() else {
            return Decision::new(true, Layer::Baseline);
        };
        if !self.registry.is_known_segment(module, segment) {
            return Decision::new(true, Layer::Baseline);
        }
        if self.can_access_feature_key(module, segment) {
            Decision::new(true, Layer::Baseline)
        } else {
            Decision::deny()
        }
    }

    /// The unified action check, with the precedence documented on this
    /// module.
    pub fn can_perform_action(&self, key: &str, action: &Action) -> Decision {
        let key = key.trim();
        if key.is_empty() {
            return Decision::deny();
        }
        if self.is_super() {
            return Decision::new(true, Layer::Super);
        }

        if let Some(page) = self.route.and_then(|route| self.page_cache.get(route)) {
            return Decision::new(page.allows(action), Layer::PageCache);
        }

        if let Some(value) = self.session.peek(key, action) {
            return Decision::new(value, Layer::SessionOverride);
        }

        if let Some(value) = self.global.get(action) {
            return Decision::new(value, Layer::GlobalOverride);
        }

        match self.snapshot.lookup(key, None) {
            Some(record) if record.allows(action) => Decision::new(true, Layer::Baseline),
            _ => Decision::deny(),
        }
    }

    /// Module keys in backend order; the wildcard is not a module.
    pub fn enabled_modules(&self) -> Vec<String> {
        self.snapshot
            .enabled_modules()
            .iter()
            .filter(|m| m.as_str() != crate::keys::WILDCARD)
            .cloned()
            .collect()
    }

    pub fn enabled_features(&self, module: &str) -> Vec<EntryInfo> {
        self.registry
            .list_features(module)
            .into_iter()
            .filter(|e| self.is_feature_enabled(module, &e.key))
            .collect()
    }

    pub fn enabled_dashboards(&self, module: &str) -> Vec<EntryInfo> {
        self.registry
            .list_dashboards(module)
            .into_iter()
            .filter(|e| self.is_dashboard_enabled(module, &e.key))
            .collect()
    }

    pub fn disabled_features(&self, module: &str) -> Vec<EntryInfo> {
        self.registry
            .list_features(module)
            .into_iter()
            .filter(|e| !self.is_feature_enabled(module, &e.key))
            .collect()
    }
}
