//! Store trait definitions for data access abstraction.
//!
//! All store operations are async. Reads must be safe under arbitrary
//! concurrent access; mutations rely on the underlying store's transaction
//! isolation so a concurrent reader observes either the fully-old or
//! fully-new state, never a partial one.

use uuid::Uuid;

use crate::error::WardenResult;
use crate::models::{
    action::{Action, CreateAction, UpdateAction},
    permission::{CreatePermission, Permission, UpdatePermission},
    resource::{CreateResource, Resource, UpdateResource},
    role::{CreateRole, Role, UpdateRole},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Catalog store (resources, actions, permissions)
// ---------------------------------------------------------------------------

pub trait ResourceRepository: Send + Sync {
    /// Fails with `DuplicateName` if a resource with that name exists.
    fn create(&self, input: CreateResource) -> impl Future<Output = WardenResult<Resource>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Resource>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = WardenResult<Resource>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateResource,
    ) -> impl Future<Output = WardenResult<Resource>> + Send;
    /// Deletes the resource and cascades to every permission referencing
    /// it, including those permissions' role grants. The whole cascade is
    /// atomic: either all of it applies or none of it does.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Resource>>> + Send;
}

pub trait ActionRepository: Send + Sync {
    /// Fails with `DuplicateName` if an action with that name exists.
    fn create(&self, input: CreateAction) -> impl Future<Output = WardenResult<Action>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Action>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = WardenResult<Action>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateAction,
    ) -> impl Future<Output = WardenResult<Action>> + Send;
    /// Deletes the action and cascades to every permission referencing it,
    /// atomically, like [`ResourceRepository::delete`].
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Action>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    /// Fails with `UnknownReference` if the resource or action id does not
    /// resolve, and with `DuplicateName` if a permission for that
    /// (resource, action) pair already exists.
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = WardenResult<Permission>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Permission>> + Send;
    /// Looks a permission up by its (resource, action) pair.
    fn get_by_pair(
        &self,
        resource_id: Uuid,
        action_id: Uuid,
    ) -> impl Future<Output = WardenResult<Permission>> + Send;
    /// Re-pointing the permission re-checks pair uniqueness against the
    /// prospective pair.
    fn update(
        &self,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = WardenResult<Permission>> + Send;
    /// Removes the permission and every role grant referencing it.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Permission>>> + Send;
}

// ---------------------------------------------------------------------------
// Role store and role assignment
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    /// Fails with `DuplicateName` on a name collision and with
    /// `UnknownReference` if any entry of `permission_ids` does not
    /// resolve. Installs the full permission set on success.
    fn create(&self, input: CreateRole) -> impl Future<Output = WardenResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Role>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = WardenResult<Role>> + Send;
    /// When `input.permission_ids` is `Some`, the role's entire permission
    /// set is replaced atomically: the old set is discarded and the new
    /// one installed in a single transaction. An empty vector clears the
    /// set; `None` leaves it untouched.
    fn update(&self, id: Uuid, input: UpdateRole)
    -> impl Future<Output = WardenResult<Role>> + Send;
    /// Removes the role, its permission grants, and its membership in
    /// every user's role set. Never deletes permission records.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Role>>> + Send;

    /// The role's current permission set.
    fn get_permissions(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<Permission>>> + Send;

    /// True iff the role's permission set contains a permission whose
    /// resource name and action name both match exactly (case-sensitive)
    /// on the same record.
    fn has_permission(
        &self,
        role_id: Uuid,
        resource_name: &str,
        action_name: &str,
    ) -> impl Future<Output = WardenResult<bool>> + Send;

    /// Assign a role to a user. Set semantics: assigning an already
    /// assigned role is a no-op, not a duplicate.
    fn assign_to_user(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;

    /// Remove a role assignment from a user.
    fn unassign_from_user(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;

    /// All roles currently assigned to the user.
    fn get_user_roles(&self, user_id: Uuid) -> impl Future<Output = WardenResult<Vec<Role>>> + Send;

    /// Number of users currently holding the role.
    fn count_users(&self, role_id: Uuid) -> impl Future<Output = WardenResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// User store
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Fails with `DuplicateName` if the email is already registered.
    fn create(&self, input: CreateUser) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = WardenResult<User>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser)
    -> impl Future<Output = WardenResult<User>> + Send;
    /// Soft delete: sets `is_active = false` and stamps `deleted_at`.
    /// The record is never physically removed. Repeating the call keeps
    /// the original deletion timestamp.
    fn soft_delete(&self, id: Uuid) -> impl Future<Output = WardenResult<User>> + Send;
    /// Reverses a soft delete: clears `deleted_at` and reinstates
    /// `is_active`. Idempotent.
    fn restore(&self, id: Uuid) -> impl Future<Output = WardenResult<User>> + Send;
    /// With `include_deleted = false`, only active, non-deleted accounts
    /// are listed.
    fn list(
        &self,
        pagination: Pagination,
        include_deleted: bool,
    ) -> impl Future<Output = WardenResult<PaginatedResult<User>>> + Send;
}
