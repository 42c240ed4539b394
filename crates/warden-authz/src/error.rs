//! Access-control error types.

use thiserror::Error;
use warden_core::error::WardenError;

/// Outcome of a failed gate check.
///
/// `Unauthenticated` and `Forbidden` are deliberately distinct variants so
/// the HTTP boundary can map them to different responses; a caller without
/// an identity is never reported as forbidden.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("no permission to {action} {resource}")]
    Forbidden { resource: String, action: String },

    /// A store failure surfaced while evaluating the check.
    #[error(transparent)]
    Store(#[from] WardenError),
}

impl From<AccessError> for WardenError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => WardenError::Unauthenticated,
            AccessError::Forbidden { resource, action } => {
                WardenError::Forbidden { resource, action }
            }
            AccessError::Store(inner) => inner,
        }
    }
}
