//! Database-specific error types and conversions.

use warden_core::error::WardenError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity} name: {name}")]
    Duplicate { entity: String, name: String },
}

impl From<DbError> for WardenError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => WardenError::UnknownReference { entity, id },
            DbError::Duplicate { entity, name } => WardenError::DuplicateName { entity, name },
            other => WardenError::Database(other.to_string()),
        }
    }
}
