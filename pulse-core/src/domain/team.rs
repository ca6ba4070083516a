//! Team domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A team canvas, the shared resource the edit lease protects
///
/// Only the fields needed for ownership checks live here; the rest of the
/// team chart model is unrelated CRUD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
}
