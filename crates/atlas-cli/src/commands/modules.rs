//! Modules command implementation.

use atlas_rbac::{EntryInfo, Registry};
use clap::Parser;
use serde::Serialize;

use super::suggest;
use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput};

/// List registry modules, or one module's features and dashboards
#[derive(Debug, Parser)]
pub struct ModulesCommand {
    /// Module key to describe
    pub module: Option<String>,
}

impl ModulesCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let registry = Registry::builtin();
        match &self.module {
            None => print_output(ctx, &ModuleList::from_registry(&registry)),
            Some(key) => {
                let module = registry.get_module(key).ok_or_else(|| CliError::NotFound {
                    resource_type: "module",
                    name: key.clone(),
                    suggestions: suggest(key, registry.list_module_keys()),
                })?;
                let detail = ModuleDetail {
                    key: module.key.to_string(),
                    name: module.name.to_string(),
                    features: registry.list_features(module.key),
                    dashboards: registry.list_dashboards(module.key),
                };
                print_output(ctx, &detail)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ModuleSummary {
    key: String,
    name: String,
    features: usize,
    dashboards: usize,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct ModuleList(Vec<ModuleSummary>);

impl ModuleList {
    fn from_registry(registry: &Registry) -> Self {
        Self(
            registry
                .modules()
                .iter()
                .map(|m| ModuleSummary {
                    key: m.key.to_string(),
                    name: m.name.to_string(),
                    features: m.features.len(),
                    dashboards: m.dashboards.len(),
                })
                .collect(),
        )
    }
}

impl FormattedOutput for ModuleList {
    fn format_text(&self) -> String {
        let width = self.0.iter().map(|m| m.key.len()).max().unwrap_or(0);
        self.0
            .iter()
            .map(|m| {
                format!(
                    "{:width$}  {} ({} features, {} dashboards)",
                    m.key, m.name, m.features, m.dashboards
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ModuleDetail {
    key: String,
    name: String,
    features: Vec<EntryInfo>,
    dashboards: Vec<EntryInfo>,
}

impl FormattedOutput for ModuleDetail {
    fn format_text(&self) -> String {
        let mut out = format!("{} ({})\n", self.name, self.key);
        out.push_str("features:\n");
        for entry in &self.features {
            out.push_str(&format!("  {}  {}\n", entry.canonical_key, entry.label));
        }
        if !self.dashboards.is_empty() {
            out.push_str("dashboards:\n");
            for entry in &self.dashboards {
                out.push_str(&format!("  {}  {}\n", entry.canonical_key, entry.label));
            }
        }
        out.trim_end().to_string()
    }
}
