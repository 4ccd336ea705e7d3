//! Append-only audit log entries for security-relevant transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: None,
            user_id: None,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            details: serde_json::Value::Null,
            ip_address: None,
            created_at: Utc::now(),
        }
    }

    pub fn organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }
}
