//! Edit lease DTOs

use serde::{Deserialize, Serialize};

/// Result of a lease check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseCheck {
    pub can_edit: bool,
    pub editing_user_name: Option<String>,
}

/// Result of a lease acquisition attempt
///
/// A conflict is a structured result, not an error: callers branch on
/// `acquired` and render the holder's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseAcquire {
    pub acquired: bool,
    pub editing_user_name: Option<String>,
}

/// Request body for lease acquisition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcquireRequest {
    pub user_name: Option<String>,
}
