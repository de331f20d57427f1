//! Global override command implementation.

use atlas_rbac::{Action, FileSettings, GlobalOverride, OverrideFlags};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput};

/// Show or persist global overrides
#[derive(Debug, Parser)]
pub struct GlobalCommand {
    #[command(subcommand)]
    pub action: GlobalAction,
}

#[derive(Debug, Subcommand)]
pub enum GlobalAction {
    /// Print the persisted global overrides
    Show,

    /// Persist one global override
    Set {
        /// view, create, edit or delete
        action: String,

        /// `off` persists "0", which reads back as unset
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl GlobalCommand {
    pub fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let settings = FileSettings::open(&ctx.config.storage.settings_path);
        let mut global = GlobalOverride::load(&settings);

        if let GlobalAction::Set { action, state } = &self.action {
            let parsed = Action::parse(action);
            if GlobalOverride::storage_key(&parsed).is_none() {
                return Err(CliError::Validation {
                    message: format!("'{action}' is not a global override action"),
                    hint: Some("use one of: view, create, edit, delete".to_string()),
                });
            }
            global.set(&settings, &parsed, *state == Toggle::On)?;
        }

        print_output(ctx, &GlobalReport::new(global.flags()))
    }
}

#[derive(Debug, Serialize)]
struct GlobalReport {
    can_view: bool,
    can_create: bool,
    can_edit: bool,
    can_delete: bool,
}

impl GlobalReport {
    fn new(flags: OverrideFlags) -> Self {
        let on = |action: Action| flags.get(&action) == Some(true);
        Self {
            can_view: on(Action::View),
            can_create: on(Action::Create),
            can_edit: on(Action::Edit),
            can_delete: on(Action::Delete),
        }
    }
}

impl FormattedOutput for GlobalReport {
    fn format_text(&self) -> String {
        let state = |on: bool| if on { "on" } else { "off" };
        format!(
            "view: {}\ncreate: {}\nedit: {}\ndelete: {}",
            state(self.can_view),
            state(self.can_create),
            state(self.can_edit),
            state(self.can_delete)
        )
    }
}
