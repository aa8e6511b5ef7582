//! Audit records appended to the event queue.

use serde::{Deserialize, Serialize};

/// One audit trail entry, e.g.
/// `{"TableName":"Orders","Action":"Create","Description":"Order 42 created."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    pub action: String,
    pub description: String,
}

impl AuditEvent {
    /// An event about a change to one of the entity tables.
    #[must_use]
    pub fn table(table_name: &str, action: &str, description: impl Into<String>) -> Self {
        Self {
            table_name: Some(table_name.to_owned()),
            action: action.to_owned(),
            description: description.into(),
        }
    }

    /// An event about a session (login, logout, registration).
    #[must_use]
    pub fn session(action: &str, description: impl Into<String>) -> Self {
        Self {
            table_name: None,
            action: action.to_owned(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn order_created(order_id: &str) -> Self {
        Self::table("Orders", "Create", format!("Order {order_id} created."))
    }
}
