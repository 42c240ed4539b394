//! Account lifecycle — registration, soft delete, restore.

use tracing::info;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::role::CreateRole;
use warden_core::models::user::{CreateUser, User};
use warden_core::repository::{RoleRepository, UserRepository};

use crate::config::AuthzConfig;

/// Input for the registration flow.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
}

/// User lifecycle orchestration.
///
/// Generic over repository implementations so that this layer has no
/// dependency on the database crate.
pub struct AccountService<U: UserRepository, R: RoleRepository> {
    user_repo: U,
    role_repo: R,
    config: AuthzConfig,
}

impl<U: UserRepository, R: RoleRepository> AccountService<U, R> {
    pub fn new(user_repo: U, role_repo: R, config: AuthzConfig) -> Self {
        Self {
            user_repo,
            role_repo,
            config,
        }
    }

    /// Create a user and hand them the default role, creating that role
    /// on first use.
    pub async fn register(&self, input: Registration) -> WardenResult<User> {
        // 1. Create the account.
        let user = self
            .user_repo
            .create(CreateUser {
                email: input.email,
                first_name: input.first_name,
                last_name: input.last_name,
                middle_name: input.middle_name,
            })
            .await?;

        // 2. Get-or-create the default role. It carries no permissions;
        //    grants are an administrative decision.
        let role = match self
            .role_repo
            .get_by_name(&self.config.default_role_name)
            .await
        {
            Ok(role) => role,
            Err(WardenError::UnknownReference { .. }) => {
                self.role_repo
                    .create(CreateRole {
                        name: self.config.default_role_name.clone(),
                        description: self.config.default_role_description.clone(),
                        permission_ids: Vec::new(),
                    })
                    .await?
            }
            Err(e) => return Err(e),
        };

        // 3. Assign it.
        self.role_repo.assign_to_user(user.id, role.id).await?;

        info!(user = %user.email, role = %role.name, "registered user");
        Ok(user)
    }

    /// Soft delete an account: permitted for the account owner and for
    /// superusers. The record survives and can be restored later.
    pub async fn deactivate(&self, actor: &User, user_id: Uuid) -> WardenResult<User> {
        if actor.id != user_id && !actor.is_superuser {
            return Err(WardenError::Forbidden {
                resource: "user".into(),
                action: "delete".into(),
            });
        }

        let user = self.user_repo.soft_delete(user_id).await?;
        info!(user = %user.email, "soft-deleted user");
        Ok(user)
    }

    /// Reverse a soft delete. Administrator-only: regular role-holders
    /// cannot restore accounts.
    pub async fn restore(&self, actor: &User, user_id: Uuid) -> WardenResult<User> {
        if !actor.is_superuser {
            return Err(WardenError::Forbidden {
                resource: "user".into(),
                action: "restore".into(),
            });
        }

        let user = self.user_repo.restore(user_id).await?;
        info!(user = %user.email, "restored user");
        Ok(user)
    }
}
