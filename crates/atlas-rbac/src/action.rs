//! Actions a permission check can ask about.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Requested capability. `Other` carries any unrecognized action name; it
/// maps to `can_<name>` and never matches a known capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Action {
    #[default]
    View,
    Create,
    Edit,
    Delete,
    Other(String),
}

impl Action {
    /// The four capabilities carried by a permission record.
    pub const CAPABILITIES: [Action; 4] = [Action::View, Action::Create, Action::Edit, Action::Delete];

    /// Parse `"edit"` or `"can_edit"` style names. Matching is exact.
    pub fn parse(name: &str) -> Self {
        let bare = name.strip_prefix("can_").unwrap_or(name);
        match bare {
            "view" => Action::View,
            "create" => Action::Create,
            "edit" => Action::Edit,
            "delete" => Action::Delete,
            other => Action::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Other(name) => name,
        }
    }

    /// Record field this action reads, e.g. `can_edit`.
    pub fn field_name(&self) -> String {
        format!("can_{}", self.as_str())
    }

    pub fn is_view(&self) -> bool {
        matches!(self, Action::View)
    }

    /// Create, edit and delete all imply view.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Action::Create | Action::Edit | Action::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("view", Action::View)]
    #[test_case("can_view", Action::View)]
    #[test_case("create", Action::Create)]
    #[test_case("can_edit", Action::Edit)]
    #[test_case("delete", Action::Delete)]
    #[test_case("approve", Action::Other("approve".into()))]
    #[test_case("View", Action::Other("View".into()) ; "case sensitive")]
    fn test_parse(input: &str, expected: Action) {
        assert_eq!(Action::parse(input), expected);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(Action::View.field_name(), "can_view");
        assert_eq!(Action::Delete.field_name(), "can_delete");
        assert_eq!(Action::parse("export").field_name(), "can_export");
    }

    #[test]
    fn test_default_is_view() {
        assert_eq!(Action::default(), Action::View);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Action::Edit).unwrap();
        assert_eq!(json, "\"edit\"");
        let parsed: Action = serde_json::from_str("\"can_create\"").unwrap();
        assert_eq!(parsed, Action::Create);
    }
}
