//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named, reusable bundle of permissions.
///
/// The permission set itself lives in the store as role → permission
/// grants; it is read through [`RoleRepository::get_permissions`].
///
/// [`RoleRepository::get_permissions`]: crate::repository::RoleRepository::get_permissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    /// Unique, non-empty.
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: String,
    /// Initial permission set. Every id must resolve.
    pub permission_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some` replaces the role's entire permission set atomically (an
    /// empty vector clears it); `None` leaves the set untouched. Partial
    /// add/remove is not supported at this layer.
    pub permission_ids: Option<Vec<Uuid>>,
}
