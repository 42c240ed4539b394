//! Capability-gated management surface for the catalog and roles.
//!
//! Every mutation behind this service requires the
//! `("permissions", "manage")` capability; superusers pass through the
//! engine's override. This is the only path administrative tooling should
//! use to edit resources, actions, permissions, roles, and role
//! assignments.

use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::{
    action::{Action, CreateAction, UpdateAction},
    permission::{CreatePermission, Permission, UpdatePermission},
    resource::{CreateResource, Resource, UpdateResource},
    role::{CreateRole, Role, UpdateRole},
    user::User,
};
use warden_core::repository::{
    ActionRepository, PaginatedResult, Pagination, PermissionRepository, ResourceRepository,
    RoleRepository,
};

use crate::engine::AuthzEngine;
use crate::gate::{Gate, MANAGE_ACTION, MANAGE_RESOURCE};

/// Administrative management surface over the catalog and role stores.
pub struct ManagementService<C, A, P, R>
where
    C: ResourceRepository,
    A: ActionRepository,
    P: PermissionRepository,
    R: RoleRepository + Clone,
{
    resources: C,
    actions: A,
    permissions: P,
    roles: R,
    engine: AuthzEngine<R>,
    gate: Gate,
}

impl<C, A, P, R> ManagementService<C, A, P, R>
where
    C: ResourceRepository,
    A: ActionRepository,
    P: PermissionRepository,
    R: RoleRepository + Clone,
{
    pub fn new(resources: C, actions: A, permissions: P, roles: R) -> Self {
        let engine = AuthzEngine::new(roles.clone());
        Self {
            resources,
            actions,
            permissions,
            roles,
            engine,
            gate: Gate::manage_permissions(),
        }
    }

    async fn require_manage(&self, actor: Option<&User>) -> WardenResult<()> {
        self.gate
            .permit(&self.engine, actor)
            .await
            .map_err(WardenError::from)
    }

    // -- Resources ---------------------------------------------------------

    pub async fn create_resource(
        &self,
        actor: Option<&User>,
        input: CreateResource,
    ) -> WardenResult<Resource> {
        self.require_manage(actor).await?;
        self.resources.create(input).await
    }

    pub async fn update_resource(
        &self,
        actor: Option<&User>,
        id: Uuid,
        input: UpdateResource,
    ) -> WardenResult<Resource> {
        self.require_manage(actor).await?;
        self.resources.update(id, input).await
    }

    pub async fn delete_resource(&self, actor: Option<&User>, id: Uuid) -> WardenResult<()> {
        self.require_manage(actor).await?;
        self.resources.delete(id).await
    }

    pub async fn list_resources(
        &self,
        actor: Option<&User>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Resource>> {
        self.require_manage(actor).await?;
        self.resources.list(pagination).await
    }

    // -- Actions -----------------------------------------------------------

    pub async fn create_action(
        &self,
        actor: Option<&User>,
        input: CreateAction,
    ) -> WardenResult<Action> {
        self.require_manage(actor).await?;
        self.actions.create(input).await
    }

    pub async fn update_action(
        &self,
        actor: Option<&User>,
        id: Uuid,
        input: UpdateAction,
    ) -> WardenResult<Action> {
        self.require_manage(actor).await?;
        self.actions.update(id, input).await
    }

    pub async fn delete_action(&self, actor: Option<&User>, id: Uuid) -> WardenResult<()> {
        self.require_manage(actor).await?;
        self.actions.delete(id).await
    }

    pub async fn list_actions(
        &self,
        actor: Option<&User>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Action>> {
        self.require_manage(actor).await?;
        self.actions.list(pagination).await
    }

    // -- Permissions -------------------------------------------------------

    pub async fn create_permission(
        &self,
        actor: Option<&User>,
        input: CreatePermission,
    ) -> WardenResult<Permission> {
        self.require_manage(actor).await?;
        self.permissions.create(input).await
    }

    pub async fn update_permission(
        &self,
        actor: Option<&User>,
        id: Uuid,
        input: UpdatePermission,
    ) -> WardenResult<Permission> {
        self.require_manage(actor).await?;
        self.permissions.update(id, input).await
    }

    pub async fn delete_permission(&self, actor: Option<&User>, id: Uuid) -> WardenResult<()> {
        self.require_manage(actor).await?;
        self.permissions.delete(id).await
    }

    pub async fn list_permissions(
        &self,
        actor: Option<&User>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Permission>> {
        self.require_manage(actor).await?;
        self.permissions.list(pagination).await
    }

    // -- Roles and assignment ---------------------------------------------

    pub async fn create_role(&self, actor: Option<&User>, input: CreateRole) -> WardenResult<Role> {
        self.require_manage(actor).await?;
        self.roles.create(input).await
    }

    pub async fn update_role(
        &self,
        actor: Option<&User>,
        id: Uuid,
        input: UpdateRole,
    ) -> WardenResult<Role> {
        self.require_manage(actor).await?;
        self.roles.update(id, input).await
    }

    pub async fn delete_role(&self, actor: Option<&User>, id: Uuid) -> WardenResult<()> {
        self.require_manage(actor).await?;
        self.roles.delete(id).await
    }

    pub async fn list_roles(
        &self,
        actor: Option<&User>,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<Role>> {
        self.require_manage(actor).await?;
        self.roles.list(pagination).await
    }

    pub async fn assign_role(
        &self,
        actor: Option<&User>,
        user_id: Uuid,
        role_id: Uuid,
    ) -> WardenResult<()> {
        self.require_manage(actor).await?;
        self.roles.assign_to_user(user_id, role_id).await
    }

    pub async fn revoke_role(
        &self,
        actor: Option<&User>,
        user_id: Uuid,
        role_id: Uuid,
    ) -> WardenResult<()> {
        self.require_manage(actor).await?;
        self.roles.unassign_from_user(user_id, role_id).await
    }

    /// Number of users holding the role.
    pub async fn role_user_count(&self, actor: Option<&User>, role_id: Uuid) -> WardenResult<u64> {
        self.require_manage(actor).await?;
        self.roles.count_users(role_id).await
    }
}

/// Idempotently provision the management capability at startup: the
/// `permissions` resource, the `manage` action, and their pair. Runs
/// before any actor exists, so it is deliberately ungated; call it from
/// the service bootstrap only.
pub async fn seed_manage_capability<C, A, P>(
    resources: &C,
    actions: &A,
    permissions: &P,
) -> WardenResult<Permission>
where
    C: ResourceRepository,
    A: ActionRepository,
    P: PermissionRepository,
{
    let resource = match resources.get_by_name(MANAGE_RESOURCE).await {
        Ok(resource) => resource,
        Err(WardenError::UnknownReference { .. }) => {
            resources
                .create(CreateResource {
                    name: MANAGE_RESOURCE.into(),
                    description: "The access-control catalog".into(),
                })
                .await?
        }
        Err(e) => return Err(e),
    };

    let action = match actions.get_by_name(MANAGE_ACTION).await {
        Ok(action) => action,
        Err(WardenError::UnknownReference { .. }) => {
            actions
                .create(CreateAction {
                    name: MANAGE_ACTION.into(),
                    description: "Administer the access-control catalog".into(),
                })
                .await?
        }
        Err(e) => return Err(e),
    };

    match permissions.get_by_pair(resource.id, action.id).await {
        Ok(permission) => Ok(permission),
        Err(WardenError::UnknownReference { .. }) => {
            permissions
                .create(CreatePermission {
                    resource_id: resource.id,
                    action_id: action.id,
                    description: "Manage resources, actions, permissions, and roles".into(),
                })
                .await
        }
        Err(e) => Err(e),
    }
}
