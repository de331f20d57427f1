//! Decision audit logging.

use crate::action::Action;
use crate::evaluator::{Decision, Layer};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// What kind of check produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Action,
    Path,
}

/// One audited permission decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionEvent {
    pub timestamp: DateTime<Utc>,
    pub user: Option<String>,
    pub check: CheckKind,
    /// Feature key or path that was checked.
    pub subject: String,
    pub action: String,
    pub granted: bool,
    pub layer: Layer,
}

impl DecisionEvent {
    pub fn new(
        user: Option<&str>,
        check: CheckKind,
        subject: &str,
        action: &Action,
        decision: Decision,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user: user.map(String::from),
            check,
            subject: subject.to_string(),
            action: action.to_string(),
            granted: decision.granted,
            layer: decision.layer,
        }
    }

    pub fn log(&self) {
        if self.granted {
            debug!(
                event = "rbac_granted",
                user = ?self.user,
                check = ?self.check,
                subject = %self.subject,
                action = %self.action,
                layer = %self.layer,
                "Permission granted"
            );
        } else {
            info!(
                event = "rbac_denied",
                user = ?self.user,
                check = ?self.check,
                subject = %self.subject,
                action = %self.action,
                layer = %self.layer,
                "Permission denied"
            );
        }
    }
}

/// Log a decision.
pub fn log_decision(
    user: Option<&str>,
    check: CheckKind,
    subject: &str,
    action: &Action,
    decision: Decision,
) {
    DecisionEvent::new(user, check, subject, action, decision).log();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_fields() {
        let event = DecisionEvent::new(
            Some("u-7"),
            CheckKind::Action,
            "sales:customers",
            &Action::Create,
            Decision::new(false, Layer::Denied),
        );
        assert_eq!(event.user.as_deref(), Some("u-7"));
        assert_eq!(event.action, "create");
        assert!(!event.granted);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["layer"], "denied");
        assert_eq!(json["check"], "action");
        event.log();
    }
}
