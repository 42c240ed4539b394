//! Authorization decision engine.

use std::collections::HashSet;

use tracing::debug;
use warden_core::error::WardenResult;
use warden_core::models::permission::Permission;
use warden_core::models::user::User;
use warden_core::repository::RoleRepository;

/// Verdict of an authorization query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allow(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The authorization decision engine.
///
/// Generic over the role store so the engine has no dependency on the
/// database crate. Every query is a pure read over current store state;
/// nothing is cached between calls, so role and permission edits take
/// effect on the very next query. The engine holds no mutable state and
/// is safe to share across concurrent checks.
pub struct AuthzEngine<R: RoleRepository> {
    role_repo: R,
}

impl<R: RoleRepository> AuthzEngine<R> {
    pub fn new(role_repo: R) -> Self {
        Self { role_repo }
    }

    /// Decide whether `user` may perform `action_name` on `resource_name`.
    ///
    /// Rules, in order, first match wins:
    /// 1. No identity → `Deny` (the gate reports this as unauthenticated
    ///    rather than forbidden).
    /// 2. Superusers are allowed unconditionally, bypassing role
    ///    evaluation. Account state (`is_active`, `deleted_at`) is not
    ///    consulted on either path; boundaries that must exclude
    ///    soft-deleted identities check those fields before calling in.
    /// 3. Otherwise allow iff some assigned role carries a permission
    ///    whose resource name and action name both match exactly.
    pub async fn authorize(
        &self,
        user: Option<&User>,
        resource_name: &str,
        action_name: &str,
    ) -> WardenResult<Decision> {
        let Some(user) = user else {
            return Ok(Decision::Deny);
        };

        if user.is_superuser {
            return Ok(Decision::Allow);
        }

        let roles = self.role_repo.get_user_roles(user.id).await?;
        for role in &roles {
            if self
                .role_repo
                .has_permission(role.id, resource_name, action_name)
                .await?
            {
                return Ok(Decision::Allow);
            }
        }

        debug!(
            user = %user.email,
            resource = resource_name,
            action = action_name,
            "authorization denied"
        );
        Ok(Decision::Deny)
    }

    /// The user's effective permission set: the union of the permission
    /// sets of every assigned role, deduplicated. Recomputed on each call.
    pub async fn effective_permissions(&self, user: &User) -> WardenResult<Vec<Permission>> {
        let roles = self.role_repo.get_user_roles(user.id).await?;

        let mut seen = HashSet::new();
        let mut union = Vec::new();
        for role in &roles {
            for permission in self.role_repo.get_permissions(role.id).await? {
                if seen.insert(permission.id) {
                    union.push(permission);
                }
            }
        }

        Ok(union)
    }
}
