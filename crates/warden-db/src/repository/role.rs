//! SurrealDB implementation of [`RoleRepository`].
//!
//! A role's permission set is stored as `grants` edges (role →
//! permission); user assignment as `has_role` edges (user → role).
//! Set replacement and deletion run as single transactions so concurrent
//! readers never observe a half-installed set.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::permission::Permission;
use warden_core::models::role::{CreateRole, Role, UpdateRole};
use warden_core::repository::{PaginatedResult, Pagination, RoleRepository};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self, id: Uuid) -> Role {
        Role {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Role {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    resource_id: String,
    action_id: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let resource_id = Uuid::parse_str(&self.resource_id)
            .map_err(|e| DbError::Migration(format!("invalid resource UUID: {e}")))?;
        let action_id = Uuid::parse_str(&self.action_id)
            .map_err(|e| DbError::Migration(format!("invalid action UUID: {e}")))?;
        Ok(Permission {
            id,
            resource_id,
            action_id,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Build the RELATE statement installing a role's grants. Targets are
/// UUID strings generated locally, never caller text.
fn grants_statement(role_id: &str, permission_ids: &[String]) -> String {
    let targets = permission_ids
        .iter()
        .map(|p| format!("permission:`{p}`"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("RELATE role:`{role_id}` -> grants -> [{targets}];")
}

/// SurrealDB implementation of the Role store and the user → role
/// assignment store.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn name_taken(&self, name: &str, exclude_id: Option<&str>) -> Result<bool, DbError> {
        let query = match exclude_id {
            Some(_) => {
                "SELECT count() AS total FROM role \
                 WHERE name = $name AND meta::id(id) != $exclude GROUP ALL"
            }
            None => "SELECT count() AS total FROM role WHERE name = $name GROUP ALL",
        };

        let mut result = self
            .db
            .query(query)
            .bind(("name", name.to_string()))
            .bind(("exclude", exclude_id.map(|s| s.to_string())))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn record_exists(&self, table: &str, id: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM type::record('{table}', $id) GROUP ALL"
            ))
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    /// Deduplicate and resolve a set of permission references, failing
    /// with `UnknownReference` on the first id that does not exist.
    async fn resolve_permission_refs(&self, ids: &[Uuid]) -> WardenResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for id in ids {
            let s = id.to_string();
            if seen.insert(s.clone()) {
                unique.push(s);
            }
        }
        if unique.is_empty() {
            return Ok(unique);
        }

        let mut result = self
            .db
            .query("SELECT VALUE meta::id(id) FROM permission WHERE meta::id(id) IN $ids")
            .bind(("ids", unique.clone()))
            .await
            .map_err(DbError::from)?;
        let found: Vec<String> = result.take(0).map_err(DbError::from)?;

        for id in &unique {
            if !found.contains(id) {
                return Err(WardenError::UnknownReference {
                    entity: "permission".into(),
                    id: id.clone(),
                });
            }
        }
        Ok(unique)
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> WardenResult<Role> {
        if input.name.is_empty() {
            return Err(WardenError::Validation {
                message: "role name must not be empty".into(),
            });
        }
        if self.name_taken(&input.name, None).await? {
            return Err(WardenError::DuplicateName {
                entity: "role".into(),
                name: input.name,
            });
        }

        let permission_ids = self.resolve_permission_refs(&input.permission_ids).await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        // Role record and its initial grants land together or not at all.
        let mut stmts = vec![
            "BEGIN TRANSACTION;".to_string(),
            "CREATE type::record('role', $id) SET \
             name = $name, description = $description;"
                .to_string(),
        ];
        if !permission_ids.is_empty() {
            stmts.push(grants_statement(&id_str, &permission_ids));
        }
        stmts.push("COMMIT TRANSACTION;".to_string());

        self.db
            .query(stmts.join(" "))
            .bind(("id", id_str))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id))
    }

    async fn get_by_name(&self, name: &str) -> WardenResult<Role> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: name.to_string(),
        })?;

        Ok(row.try_into_role()?)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> WardenResult<Role> {
        self.get_by_id(id).await?;
        let id_str = id.to_string();

        if let Some(ref name) = input.name {
            if name.is_empty() {
                return Err(WardenError::Validation {
                    message: "role name must not be empty".into(),
                });
            }
            if self.name_taken(name, Some(&id_str)).await? {
                return Err(WardenError::DuplicateName {
                    entity: "role".into(),
                    name: name.clone(),
                });
            }
        }

        // `Some` means full replacement of the grant set, `None` leaves it
        // alone. Resolve refs before touching anything.
        let replacement = match input.permission_ids {
            Some(ref ids) => Some(self.resolve_permission_refs(ids).await?),
            None => None,
        };

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let mut stmts = vec![
            "BEGIN TRANSACTION;".to_string(),
            format!("UPDATE type::record('role', $id) SET {};", sets.join(", ")),
        ];
        if let Some(ref permission_ids) = replacement {
            stmts.push("DELETE grants WHERE in = type::record('role', $id);".to_string());
            if !permission_ids.is_empty() {
                stmts.push(grants_statement(&id_str, permission_ids));
            }
        }
        stmts.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self.db.query(stmts.join(" ")).bind(("id", id_str));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> WardenResult<()> {
        self.get_by_id(id).await?;

        let id_str = id.to_string();

        // Remove the role from every user's role set and drop its grants;
        // permission records themselves stay.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE has_role WHERE out = type::record('role', $id); \
                 DELETE grants WHERE in = type::record('role', $id); \
                 DELETE type::record('role', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> WardenResult<PaginatedResult<Role>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM role GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn get_permissions(&self, role_id: Uuid) -> WardenResult<Vec<Permission>> {
        let role_id_str = role_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in = type::record('role', $role_id)\
                 ) \
                 ORDER BY created_at ASC",
            )
            .bind(("role_id", role_id_str))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;

        let permissions = rows
            .into_iter()
            .map(|row| row.try_into_permission())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(permissions)
    }

    async fn has_permission(
        &self,
        role_id: Uuid,
        resource_name: &str,
        action_name: &str,
    ) -> WardenResult<bool> {
        let role_id_str = role_id.to_string();

        // Exact, case-sensitive match on both names of the same
        // permission record.
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM grants \
                     WHERE in = type::record('role', $role_id)\
                 ) \
                 AND resource_id IN (\
                     SELECT VALUE meta::id(id) FROM resource \
                     WHERE name = $resource\
                 ) \
                 AND action_id IN (\
                     SELECT VALUE meta::id(id) FROM action \
                     WHERE name = $action\
                 ) \
                 GROUP ALL",
            )
            .bind(("role_id", role_id_str))
            .bind(("resource", resource_name.to_string()))
            .bind(("action", action_name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn assign_to_user(&self, user_id: Uuid, role_id: Uuid) -> WardenResult<()> {
        let user_id_str = user_id.to_string();
        let role_id_str = role_id.to_string();

        if !self.record_exists("user", &user_id_str).await? {
            return Err(WardenError::UnknownReference {
                entity: "user".into(),
                id: user_id_str,
            });
        }
        if !self.record_exists("role", &role_id_str).await? {
            return Err(WardenError::UnknownReference {
                entity: "role".into(),
                id: role_id_str,
            });
        }

        // Set semantics: re-assigning is a no-op.
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM has_role \
                 WHERE in = type::record('user', $user_id) \
                 AND out = type::record('role', $role_id) \
                 GROUP ALL",
            )
            .bind(("user_id", user_id_str.clone()))
            .bind(("role_id", role_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        if rows.first().map(|r| r.total).unwrap_or(0) > 0 {
            return Ok(());
        }

        let query = format!("RELATE user:`{user_id_str}` -> has_role -> role:`{role_id_str}`;");

        self.db.query(query).await.map_err(DbError::from)?;

        Ok(())
    }

    async fn unassign_from_user(&self, user_id: Uuid, role_id: Uuid) -> WardenResult<()> {
        self.db
            .query(
                "DELETE has_role WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('role', $role_id)",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_user_roles(&self, user_id: Uuid) -> WardenResult<Vec<Role>> {
        let user_id_str = user_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE id IN (\
                     SELECT VALUE out FROM has_role \
                     WHERE in = type::record('user', $user_id)\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("user_id", user_id_str))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let roles = rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(roles)
    }

    async fn count_users(&self, role_id: Uuid) -> WardenResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM has_role \
                 WHERE out = type::record('role', $role_id) \
                 GROUP ALL",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
