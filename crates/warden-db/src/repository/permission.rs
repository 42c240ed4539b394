//! SurrealDB implementation of [`PermissionRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use warden_core::repository::{PaginatedResult, Pagination, PermissionRepository};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    resource_id: String,
    action_id: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
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

impl PermissionRow {
    fn try_into_permission(self, id: Uuid) -> Result<Permission, DbError> {
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

#[derive(Debug, SurrealValue)]
struct NameRow {
    name: String,
}

/// SurrealDB implementation of the Permission catalog store.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Resolve the name of a catalog record, or `UnknownReference` when
    /// the id does not exist. `table` is `resource` or `action`.
    async fn catalog_name(&self, table: &str, id: &str) -> WardenResult<String> {
        let mut result = self
            .db
            .query(format!("SELECT name FROM type::record('{table}', $id)"))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NameRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(WardenError::UnknownReference {
            entity: table.to_string(),
            id: id.to_string(),
        })?;
        Ok(row.name)
    }

    async fn pair_taken(
        &self,
        resource_id: &str,
        action_id: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, DbError> {
        let query = match exclude_id {
            Some(_) => {
                "SELECT count() AS total FROM permission \
                 WHERE resource_id = $resource_id AND action_id = $action_id \
                 AND meta::id(id) != $exclude GROUP ALL"
            }
            None => {
                "SELECT count() AS total FROM permission \
                 WHERE resource_id = $resource_id AND action_id = $action_id \
                 GROUP ALL"
            }
        };

        let mut result = self
            .db
            .query(query)
            .bind(("resource_id", resource_id.to_string()))
            .bind(("action_id", action_id.to_string()))
            .bind(("exclude", exclude_id.map(|s| s.to_string())))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> WardenResult<Permission> {
        let resource_id_str = input.resource_id.to_string();
        let action_id_str = input.action_id.to_string();

        // Both references must resolve; the names also feed the duplicate
        // error below.
        let resource_name = self.catalog_name("resource", &resource_id_str).await?;
        let action_name = self.catalog_name("action", &action_id_str).await?;

        if self.pair_taken(&resource_id_str, &action_id_str, None).await? {
            return Err(WardenError::DuplicateName {
                entity: "permission".into(),
                name: format!("{resource_name}_{action_name}"),
            });
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 resource_id = $resource_id, action_id = $action_id, \
                 description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("resource_id", resource_id_str))
            .bind(("action_id", action_id_str))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: id_str,
        })?;

        Ok(row.try_into_permission(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Permission> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('permission', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: id_str,
        })?;

        Ok(row.try_into_permission(id)?)
    }

    async fn get_by_pair(&self, resource_id: Uuid, action_id: Uuid) -> WardenResult<Permission> {
        let resource_id_str = resource_id.to_string();
        let action_id_str = action_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE resource_id = $resource_id AND action_id = $action_id",
            )
            .bind(("resource_id", resource_id_str.clone()))
            .bind(("action_id", action_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: format!("{resource_id_str}_{action_id_str}"),
        })?;

        Ok(row.try_into_permission()?)
    }

    async fn update(&self, id: Uuid, input: UpdatePermission) -> WardenResult<Permission> {
        let current = self.get_by_id(id).await?;
        let id_str = id.to_string();

        // Prospective pair after the update.
        let new_resource = input.resource_id.unwrap_or(current.resource_id);
        let new_action = input.action_id.unwrap_or(current.action_id);
        let new_resource_str = new_resource.to_string();
        let new_action_str = new_action.to_string();

        if new_resource != current.resource_id {
            self.catalog_name("resource", &new_resource_str).await?;
        }
        if new_action != current.action_id {
            self.catalog_name("action", &new_action_str).await?;
        }
        if (new_resource, new_action) != (current.resource_id, current.action_id)
            && self
                .pair_taken(&new_resource_str, &new_action_str, Some(&id_str))
                .await?
        {
            let resource_name = self.catalog_name("resource", &new_resource_str).await?;
            let action_name = self.catalog_name("action", &new_action_str).await?;
            return Err(WardenError::DuplicateName {
                entity: "permission".into(),
                name: format!("{resource_name}_{action_name}"),
            });
        }

        let mut sets = Vec::new();
        if input.resource_id.is_some() {
            sets.push("resource_id = $resource_id");
        }
        if input.action_id.is_some() {
            sets.push("action_id = $action_id");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('permission', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if input.resource_id.is_some() {
            builder = builder.bind(("resource_id", new_resource_str));
        }
        if input.action_id.is_some() {
            builder = builder.bind(("action_id", new_action_str));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: id_str,
        })?;

        Ok(row.try_into_permission(id)?)
    }

    async fn delete(&self, id: Uuid) -> WardenResult<()> {
        self.get_by_id(id).await?;

        let id_str = id.to_string();

        // Drop the grants edges and the permission together.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE grants WHERE out = type::record('permission', $id); \
                 DELETE type::record('permission', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> WardenResult<PaginatedResult<Permission>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM permission GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_permission())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
