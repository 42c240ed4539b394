//! SurrealDB implementation of [`UserRepository`].
//!
//! Deletion is always soft: `soft_delete` flips `is_active` off and stamps
//! `deleted_at`, `restore` reverses both. Records are never physically
//! removed through this store.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::user::{CreateUser, UpdateUser, User};
use warden_core::repository::{PaginatedResult, Pagination, UserRepository};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    first_name: String,
    last_name: String,
    middle_name: Option<String>,
    is_active: bool,
    is_superuser: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    first_name: String,
    last_name: String,
    middle_name: Option<String>,
    is_active: bool,
    is_superuser: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> User {
        User {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            middle_name: self.middle_name,
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(User {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            middle_name: self.middle_name,
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the User store.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn email_taken(&self, email: &str, exclude_id: Option<&str>) -> Result<bool, DbError> {
        let query = match exclude_id {
            Some(_) => {
                "SELECT count() AS total FROM user \
                 WHERE email = $email AND meta::id(id) != $exclude GROUP ALL"
            }
            None => "SELECT count() AS total FROM user WHERE email = $email GROUP ALL",
        };

        let mut result = self
            .db
            .query(query)
            .bind(("email", email.to_string()))
            .bind(("exclude", exclude_id.map(|s| s.to_string())))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> WardenResult<User> {
        if input.email.is_empty() {
            return Err(WardenError::Validation {
                message: "email must not be empty".into(),
            });
        }
        if self.email_taken(&input.email, None).await? {
            return Err(WardenError::DuplicateName {
                entity: "user".into(),
                name: input.email,
            });
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, first_name = $first_name, \
                 last_name = $last_name, middle_name = $middle_name",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("middle_name", input.middle_name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id))
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id))
    }

    async fn get_by_email(&self, email: &str) -> WardenResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE email = $email",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: email.to_string(),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> WardenResult<User> {
        let id_str = id.to_string();

        if let Some(ref email) = input.email {
            if email.is_empty() {
                return Err(WardenError::Validation {
                    message: "email must not be empty".into(),
                });
            }
            if self.email_taken(email, Some(&id_str)).await? {
                return Err(WardenError::DuplicateName {
                    entity: "user".into(),
                    name: email.clone(),
                });
            }
        }

        let mut sets = Vec::new();
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.middle_name.is_some() {
            sets.push("middle_name = $middle_name");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.is_superuser.is_some() {
            sets.push("is_superuser = $is_superuser");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('user', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(middle_name) = input.middle_name {
            builder = builder.bind(("middle_name", middle_name));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(is_superuser) = input.is_superuser {
            builder = builder.bind(("is_superuser", is_superuser));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id))
    }

    async fn soft_delete(&self, id: Uuid) -> WardenResult<User> {
        let id_str = id.to_string();

        // Repeat calls keep the original deletion timestamp.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 is_active = false, \
                 deleted_at = deleted_at ?? time::now(), \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id))
    }

    async fn restore(&self, id: Uuid) -> WardenResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 is_active = true, \
                 deleted_at = NONE, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id))
    }

    async fn list(
        &self,
        pagination: Pagination,
        include_deleted: bool,
    ) -> WardenResult<PaginatedResult<User>> {
        let filter = if include_deleted {
            ""
        } else {
            "WHERE deleted_at = NONE AND is_active = true "
        };

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM user {filter}GROUP ALL"
            ))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM user {filter}\
                 ORDER BY last_name ASC, first_name ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
