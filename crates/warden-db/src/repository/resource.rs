//! SurrealDB implementation of [`ResourceRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::resource::{CreateResource, Resource, UpdateResource};
use warden_core::repository::{PaginatedResult, Pagination, ResourceRepository};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ResourceRow {
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ResourceRowWithId {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceRow {
    fn into_resource(self, id: Uuid) -> Resource {
        Resource {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ResourceRowWithId {
    fn try_into_resource(self) -> Result<Resource, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Resource {
            id,
            name: self.name,
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

/// SurrealDB implementation of the Resource catalog store.
#[derive(Clone)]
pub struct SurrealResourceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// True iff another resource (excluding `exclude_id`, if given)
    /// already uses this name.
    async fn name_taken(&self, name: &str, exclude_id: Option<&str>) -> Result<bool, DbError> {
        let query = match exclude_id {
            Some(_) => {
                "SELECT count() AS total FROM resource \
                 WHERE name = $name AND meta::id(id) != $exclude GROUP ALL"
            }
            None => "SELECT count() AS total FROM resource WHERE name = $name GROUP ALL",
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
}

impl<C: Connection> ResourceRepository for SurrealResourceRepository<C> {
    async fn create(&self, input: CreateResource) -> WardenResult<Resource> {
        if input.name.is_empty() {
            return Err(WardenError::Validation {
                message: "resource name must not be empty".into(),
            });
        }
        if self.name_taken(&input.name, None).await? {
            return Err(WardenError::DuplicateName {
                entity: "resource".into(),
                name: input.name,
            });
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('resource', $id) SET \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;

        Ok(row.into_resource(id))
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Resource> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('resource', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;

        Ok(row.into_resource(id))
    }

    async fn get_by_name(&self, name: &str) -> WardenResult<Resource> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM resource \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: name.to_string(),
        })?;

        Ok(row.try_into_resource()?)
    }

    async fn update(&self, id: Uuid, input: UpdateResource) -> WardenResult<Resource> {
        let id_str = id.to_string();

        if let Some(ref name) = input.name {
            if name.is_empty() {
                return Err(WardenError::Validation {
                    message: "resource name must not be empty".into(),
                });
            }
            if self.name_taken(name, Some(&id_str)).await? {
                return Err(WardenError::DuplicateName {
                    entity: "resource".into(),
                    name: name.clone(),
                });
            }
        }

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('resource', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;

        Ok(row.into_resource(id))
    }

    async fn delete(&self, id: Uuid) -> WardenResult<()> {
        // Resolve first so a bogus id is reported instead of silently
        // deleting nothing.
        self.get_by_id(id).await?;

        let id_str = id.to_string();

        // The whole cascade is one transaction: grants referencing the
        // doomed permissions, the permissions themselves, then the
        // resource.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE grants WHERE out IN \
                     (SELECT VALUE id FROM permission WHERE resource_id = $id); \
                 DELETE permission WHERE resource_id = $id; \
                 DELETE type::record('resource', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> WardenResult<PaginatedResult<Resource>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM resource GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM resource \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_resource())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
