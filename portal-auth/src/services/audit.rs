use std::sync::Arc;

use crate::models::AuditLogEntry;
use crate::store::AuthStore;

/// Append-only audit trail writer. Writes happen off the request path;
/// a failed write is logged and never propagated to the caller.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuthStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    pub fn log(&self, entry: AuditLogEntry) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let action = entry.action.clone();
            if let Err(error) = store.append_audit_entry(entry).await {
                tracing::warn!(%action, %error, "failed to append audit entry");
            }
        });
    }
}
