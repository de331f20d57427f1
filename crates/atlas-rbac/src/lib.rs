//! Client-side role-based access control for the Atlas ERP front-end.
//!
//! Given a user's role grants and any session, global or per-page
//! overrides, answers "may this user view/create/edit/delete this feature,
//! dashboard or page?".
//!
//! ```no_run
//! use atlas_rbac::{Action, MemorySettings, PermissionStore, Registry, RestBackend, UserId};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = RestBackend::from_config(&Default::default())?;
//! let store = PermissionStore::new(Arc::new(backend), Arc::new(MemorySettings::new()), Registry::builtin());
//!
//! store.set_user(Some(UserId::new("42"))).await?;
//! store.enter_route("/sales/invoices/17");
//! store.ensure_page_perms("/sales/invoices/17").await?;
//!
//! if store.can_perform_action("sales:invoices", &Action::Edit) {
//!     // show the edit button
//! }
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod audit;
pub mod backend;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod keys;
pub mod overrides;
pub mod path;
pub mod record;
pub mod registry;
pub mod settings;
pub mod snapshot;
pub mod store;

pub use action::Action;
pub use audit::{log_decision, CheckKind, DecisionEvent};
pub use backend::{PermissionBackend, RestBackend};
pub use error::{BackendError, RbacError, Result, SettingsError};
pub use evaluator::{Decision, EvalContext, Layer};
pub use events::{EventHub, RbacEvent, Subscription};
pub use keys::{FeatureKey, WILDCARD};
pub use overrides::{GlobalOverride, OverrideFlags, SessionOverrides};
pub use path::base_path_from;
pub use record::{
    merge_permissions, to_canonical_permission, PagePermissions, PermissionRecord,
    RolePermissionRow, UserOverrideRow, UserOverridesResponse, UserPermissionsResponse,
};
pub use registry::{EntryInfo, Module, Registry};
pub use settings::{FileSettings, MemorySettings, SettingsStore};
pub use snapshot::{PermissionSnapshot, UserId};
pub use store::PermissionStore;
