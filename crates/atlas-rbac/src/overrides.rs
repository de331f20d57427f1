//! Override layers that sit above the role baseline: session overrides
//! per feature key, and the persisted global "allow all" toggles.

use crate::action::Action;
use crate::error::SettingsError;
use crate::keys::FeatureKey;
use crate::settings::SettingsStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Settings key prefix for the persisted global flags.
pub const GLOBAL_KEY_PREFIX: &str = "atlas.rbac.global.";

/// Four nullable capability flags. `None` means "no opinion".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideFlags {
    #[serde(default)]
    pub can_view: Option<bool>,
    #[serde(default)]
    pub can_create: Option<bool>,
    #[serde(default)]
    pub can_edit: Option<bool>,
    #[serde(default)]
    pub can_delete: Option<bool>,
}

impl OverrideFlags {
    pub fn get(&self, action: &Action) -> Option<bool> {
        match action {
            Action::View => self.can_view,
            Action::Create => self.can_create,
            Action::Edit => self.can_edit,
            Action::Delete => self.can_delete,
            Action::Other(_) => None,
        }
    }

    /// Set one flag. Granting create, edit or delete also grants view;
    /// revoking view also revokes the other three.
    pub fn set(&mut self, action: &Action, value: Option<bool>) {
        match action {
            Action::View => {
                self.can_view = value;
                if value == Some(false) {
                    self.can_create = Some(false);
                    self.can_edit = Some(false);
                    self.can_delete = Some(false);
                }
            }
            Action::Create => self.can_create = value,
            Action::Edit => self.can_edit = value,
            Action::Delete => self.can_delete = value,
            Action::Other(_) => return,
        }
        if value == Some(true) && action.is_mutation() {
            self.can_view = Some(true);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// In-memory overrides for the current session, keyed by canonical key.
#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    entries: HashMap<FeatureKey, OverrideFlags>,
}

impl SessionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&OverrideFlags> {
        self.entries.get(key)
    }

    /// The flag for one action on one key, if set.
    pub fn peek(&self, key: &str, action: &Action) -> Option<bool> {
        self.entries.get(key).and_then(|flags| flags.get(action))
    }

    pub fn set_action(&mut self, key: FeatureKey, action: &Action, value: Option<bool>) {
        let flags = self.entries.entry(key).or_default();
        flags.set(action, value);
    }

    /// Grant `action` on every key in `keys`.
    pub fn grant_all<I>(&mut self, keys: I, action: &Action) -> usize
    where
        I: IntoIterator<Item = FeatureKey>,
    {
        let mut count = 0;
        for key in keys {
            self.set_action(key, action, Some(true));
            count += 1;
        }
        count
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureKey, &OverrideFlags)> {
        self.entries.iter()
    }
}

/// Blanket per-action overrides applying to every feature key.
///
/// Only an explicit `true` is an override. Writing `false` persists `"0"`
/// and clears the flag, so a stored `"0"` and a missing key read the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GlobalOverride {
    flags: OverrideFlags,
}

impl GlobalOverride {
    /// Settings key for `action`, or `None` for actions outside the four
    /// capabilities.
    pub fn storage_key(action: &Action) -> Option<String> {
        match action {
            Action::Other(_) => None,
            known => Some(format!("{}{}", GLOBAL_KEY_PREFIX, known.as_str())),
        }
    }

    /// Read all four flags from `settings`.
    pub fn load(settings: &dyn SettingsStore) -> Self {
        let mut flags = OverrideFlags::default();
        for action in Action::CAPABILITIES.iter() {
            if let Some(key) = Self::storage_key(action) {
                let value = settings.get_flag(&key);
                match action {
                    Action::View => flags.can_view = value,
                    Action::Create => flags.can_create = value,
                    Action::Edit => flags.can_edit = value,
                    Action::Delete => flags.can_delete = value,
                    Action::Other(_) => {}
                }
            }
        }
        Self { flags }
    }

    pub fn get(&self, action: &Action) -> Option<bool> {
        self.flags.get(action)
    }

    pub fn flags(&self) -> OverrideFlags {
        self.flags
    }

    /// Persist `value` for `action` and update the in-memory flag.
    pub fn set(
        &mut self,
        settings: &dyn SettingsStore,
        action: &Action,
        value: bool,
    ) -> Result<(), SettingsError> {
        let Some(key) = Self::storage_key(action) else {
            return Ok(());
        };
        settings.set_flag(&key, Some(value))?;

        let stored = if value { Some(true) } else { None };
        match action {
            Action::View => self.flags.can_view = stored,
            Action::Create => self.flags.can_create = stored,
            Action::Edit => self.flags.can_edit = stored,
            Action::Delete => self.flags.can_delete = stored,
            Action::Other(_) => {}
        }
        info!(action = %action, value, "global override updated");
        Ok(())
    }
}
