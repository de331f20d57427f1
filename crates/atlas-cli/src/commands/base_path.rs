//! Base-path command implementation.

use atlas_rbac::base_path_from;
use clap::Parser;
use serde::Serialize;

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput};

/// Resolve URL paths to the base path their page permissions are cached
/// under
#[derive(Debug, Parser)]
pub struct BasePathCommand {
    /// Paths to resolve
    #[arg(required = true)]
    pub paths: Vec<String>,
}

impl BasePathCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let rows = self
            .paths
            .iter()
            .map(|path| BasePathRow {
                path: path.clone(),
                base_path: base_path_from(path),
            })
            .collect();
        print_output(ctx, &BasePaths(rows))
    }
}

#[derive(Debug, Serialize)]
struct BasePathRow {
    path: String,
    base_path: String,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct BasePaths(Vec<BasePathRow>);

impl FormattedOutput for BasePaths {
    fn format_text(&self) -> String {
        self.0
            .iter()
            .map(|row| format!("{} -> {}", row.path, row.base_path))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
