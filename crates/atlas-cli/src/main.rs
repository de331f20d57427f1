//! Atlas CLI
//!
//! Main entry point for the `atlas` binary.

use std::process::ExitCode;

use atlas_common_config::{vars, Environment};
use atlas_common_log::{LogConfig, LogLevel};
use clap::Parser;
use tracing::error;

mod cli;
mod commands;
mod error;
mod output;

use cli::Cli;
use error::CliError;

fn main() -> ExitCode {
    let _env = Environment::init();
    let cli = Cli::parse();

    init_logging(&cli);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), "{e}");
            eprintln!("error[{}]: {e}", e.code());
            if let Some(hint) = e.hint() {
                eprintln!("  hint: {hint}");
            }
            e.exit_code()
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.load_config()?;
    cli.execute(config).await
}

/// `-v`/`-q` win over `ATLAS_LOG_LEVEL`; without either the CLI stays at
/// `warn`.
fn init_logging(cli: &Cli) {
    let mut config = LogConfig::from_env();
    if cli.verbose > 0 || cli.quiet || Environment::get(vars::ATLAS_LOG_LEVEL).is_none() {
        config = config.with_level(LogLevel::from_verbosity(cli.verbose, cli.quiet));
    }
    if let Err(e) = atlas_common_log::init(config) {
        eprintln!("warning: logging disabled: {e}");
    }
}
