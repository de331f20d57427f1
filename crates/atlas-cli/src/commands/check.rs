//! Check command implementation.

use std::sync::Arc;

use atlas_rbac::{
    Action, CheckKind, Decision, FileSettings, PermissionStore, RbacError, Registry, RestBackend,
    UserId,
};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{print_output, yes_no, FormattedOutput};

/// Load a user's permissions from the backend and evaluate checks
#[derive(Debug, Parser)]
pub struct CheckCommand {
    /// User whose permissions are loaded
    #[arg(short, long)]
    pub user: String,

    /// Feature keys to check, bare or `module:feature`
    #[arg(short, long = "feature", value_name = "KEY")]
    pub features: Vec<String>,

    /// URL paths to check
    #[arg(short, long = "path", value_name = "PATH")]
    pub paths: Vec<String>,

    /// Action checked against every feature and path
    #[arg(short, long, default_value = "view")]
    pub action: String,

    /// Route to enter first; its page permissions are fetched before checks
    #[arg(long, value_name = "PATH")]
    pub route: Option<String>,
}

impl CheckCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let action = Action::parse(&self.action);
        if !action.is_view() && !action.is_mutation() {
            return Err(CliError::Validation {
                message: format!("unknown action '{}'", self.action),
                hint: Some("use one of: view, create, edit, delete".to_string()),
            });
        }

        let store = build_store(ctx)?;
        store
            .set_user(Some(UserId::new(self.user.as_str())))
            .await
            .map_err(|e| CliError::backend(format!("failed to load permissions for {}", self.user), e))?;
        info!(user = %self.user, modules = store.get_enabled_modules().len(), "permissions loaded");

        if let Some(route) = &self.route {
            let base = store.enter_route(route);
            debug!(route = %route, base = %base, "entered route");
            store
                .ensure_page_perms(route)
                .await
                .map_err(|e| CliError::backend(format!("failed to load page permissions for {base}"), e))?;
        }

        let mut checks = Vec::with_capacity(self.features.len() + self.paths.len());
        for key in &self.features {
            let decision = store.check_action(key, &action);
            checks.push(CheckRow::new(CheckKind::Action, key, &action, decision));
        }
        for path in &self.paths {
            let decision = store.check_path(path, &action);
            checks.push(CheckRow::new(CheckKind::Path, path, &action, decision));
        }

        let report = CheckReport {
            user: self.user.clone(),
            is_super: store.is_super(),
            modules: store.get_enabled_modules(),
            route: store.current_route(),
            checks,
        };
        print_output(ctx, &report)
    }
}

fn build_store(ctx: &CommandContext) -> Result<PermissionStore, CliError> {
    let backend = RestBackend::from_config(&ctx.config.api)
        .map_err(|e| CliError::backend("failed to configure backend", RbacError::from(e)))?;
    let settings = FileSettings::open(&ctx.config.storage.settings_path);

    Ok(PermissionStore::new(Arc::new(backend), Arc::new(settings), Registry::builtin())
        .with_decision_audit(ctx.config.rbac.audit_decisions)
        .with_event_capacity(ctx.config.rbac.event_capacity))
}

#[derive(Debug, Serialize)]
struct CheckRow {
    check: CheckKind,
    subject: String,
    action: Action,
    granted: bool,
    layer: String,
}

impl CheckRow {
    fn new(check: CheckKind, subject: &str, action: &Action, decision: Decision) -> Self {
        Self {
            check,
            subject: subject.to_string(),
            action: action.clone(),
            granted: decision.granted,
            layer: decision.layer.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckReport {
    user: String,
    is_super: bool,
    modules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<String>,
    checks: Vec<CheckRow>,
}

impl FormattedOutput for CheckReport {
    fn format_text(&self) -> String {
        let mut out = format!("user: {}\n", self.user);
        out.push_str(&format!("super: {}\n", yes_no(self.is_super)));
        out.push_str(&format!("modules: {}\n", self.modules.join(", ")));
        if let Some(route) = &self.route {
            out.push_str(&format!("route: {route}\n"));
        }
        for row in &self.checks {
            out.push_str(&format!(
                "{} {} {}: {} ({})\n",
                if row.granted { "✓" } else { "✗" },
                row.action,
                row.subject,
                if row.granted { "allowed" } else { "denied" },
                row.layer
            ));
        }
        out.trim_end().to_string()
    }
}
