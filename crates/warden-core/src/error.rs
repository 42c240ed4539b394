//! Error types for the Warden system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Duplicate name: {entity} `{name}` already exists")]
    DuplicateName { entity: String, name: String },

    #[error("Unknown reference: {entity} with id {id}")]
    UnknownReference { entity: String, id: String },

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Forbidden: no permission to {action} {resource}")]
    Forbidden { resource: String, action: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type WardenResult<T> = Result<T, WardenError>;
