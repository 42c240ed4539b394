//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authorized (resource, action) pair.
///
/// The pair is unique: no two permissions may reference the same resource
/// and action. A permission is conventionally referred to as
/// `"<resource>_<action>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub action_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub resource_id: Uuid,
    pub action_id: Uuid,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePermission {
    /// Re-points the permission at another resource; the prospective
    /// (resource, action) pair must stay unique.
    pub resource_id: Option<Uuid>,
    /// Re-points the permission at another action; same pair constraint.
    pub action_id: Option<Uuid>,
    pub description: Option<String>,
}
