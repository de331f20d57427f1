//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use atlas_common_config::{AtlasConfig, ConfigLoader};
use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::commands::{BasePathCommand, CheckCommand, GlobalCommand, ModulesCommand};
use crate::error::CliError;

/// Atlas - inspect and evaluate ERP permissions
#[derive(Debug, Parser)]
#[command(
    name = "atlas",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "ATLAS_CONFIG_PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registry modules, or one module's features and dashboards
    Modules(ModulesCommand),

    /// Resolve URL paths to their permission base path
    BasePath(BasePathCommand),

    /// Load a user's permissions and evaluate checks
    Check(CheckCommand),

    /// Show or persist global overrides
    Global(GlobalCommand),
}

impl Cli {
    /// Load configuration from `--config` or `.atlas/config.yaml`.
    pub fn load_config(&self) -> Result<AtlasConfig, CliError> {
        let config = match &self.config {
            Some(path) => ConfigLoader::load_file(path)?,
            None => ConfigLoader::default().load()?,
        };
        Ok(config)
    }

    /// Execute the selected command
    pub async fn execute(self, config: AtlasConfig) -> Result<(), CliError> {
        let ctx = CommandContext {
            config,
            format: self.format,
            quiet: self.quiet,
        };

        match self.command {
            Command::Modules(cmd) => cmd.execute(&ctx),
            Command::BasePath(cmd) => cmd.execute(&ctx),
            Command::Check(cmd) => cmd.execute(&ctx).await,
            Command::Global(cmd) => cmd.execute(&ctx),
        }
    }
}

/// Context passed to all commands
#[derive(Debug)]
pub struct CommandContext {
    pub config: AtlasConfig,
    pub format: OutputFormat,
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["atlas", "base-path", "/sales", "--format", "json", "-vv"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::BasePath(_)));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["atlas", "-q", "-v", "modules"]).is_err());
    }
}
