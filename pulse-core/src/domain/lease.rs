//! Edit lease domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An advisory exclusive-edit lease over a shared resource
///
/// At most one live lease exists per resource, where "live" means
/// `last_seen` falls within the lease timeout window. The lease gates a UI
/// affordance only; nothing at the data layer enforces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditLease {
    pub resource_id: Uuid,
    pub holder_id: Uuid,
    pub holder_name: Option<String>,
    pub last_seen: chrono::DateTime<chrono::Utc>,
}

impl EditLease {
    /// Whether the lease has outlived the timeout window.
    pub fn is_expired(&self, timeout: std::time::Duration, now: chrono::DateTime<chrono::Utc>) -> bool {
        let age = now.signed_duration_since(self.last_seen);
        age > chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::zero())
    }
}
