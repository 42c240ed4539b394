//! Access gate: a reusable guard wrapping protected operations.
//!
//! Replaces the request-bound permission decorator of classic web stacks
//! with an explicit abstraction: the acting identity is always passed in,
//! never pulled from ambient state. The gate itself is HTTP-agnostic; the
//! boundary classifies requests with [`classify_path`] and maps denials
//! through [`AccessError::enforcement`].

use warden_core::error::WardenResult;
use warden_core::models::user::User;
use warden_core::repository::RoleRepository;

use crate::engine::{AuthzEngine, Decision};
use crate::error::AccessError;

/// Resource name of the capability gating catalog and role mutations.
pub const MANAGE_RESOURCE: &str = "permissions";
/// Action name of the capability gating catalog and role mutations.
pub const MANAGE_ACTION: &str = "manage";

/// A guard for one protected (resource, action) boundary.
#[derive(Debug, Clone)]
pub struct Gate {
    resource: String,
    action: String,
}

impl Gate {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// The gate in front of every catalog and role mutation.
    pub fn manage_permissions() -> Self {
        Self::new(MANAGE_RESOURCE, MANAGE_ACTION)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Check the caller against the engine without running anything.
    ///
    /// An absent caller yields [`AccessError::Unauthenticated`], a denied
    /// caller [`AccessError::Forbidden`], never the other way around.
    pub async fn permit<R: RoleRepository>(
        &self,
        engine: &AuthzEngine<R>,
        caller: Option<&User>,
    ) -> Result<(), AccessError> {
        match engine
            .authorize(caller, &self.resource, &self.action)
            .await?
        {
            Decision::Allow => Ok(()),
            Decision::Deny => match caller {
                None => Err(AccessError::Unauthenticated),
                Some(_) => Err(AccessError::Forbidden {
                    resource: self.resource.clone(),
                    action: self.action.clone(),
                }),
            },
        }
    }

    /// Run `op` behind the gate. The wrapped operation only executes when
    /// the caller is permitted, and its result is returned unchanged.
    pub async fn invoke<R, T, F, Fut>(
        &self,
        engine: &AuthzEngine<R>,
        caller: Option<&User>,
        op: F,
    ) -> Result<T, AccessError>
    where
        R: RoleRepository,
        F: FnOnce() -> Fut,
        Fut: Future<Output = WardenResult<T>>,
    {
        self.permit(engine, caller).await?;
        op().await.map_err(AccessError::Store)
    }
}

/// How the HTTP boundary classifies an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStyle {
    /// Programmatic caller; answered with status codes.
    Api,
    /// Browser caller; answered with redirects.
    Interactive,
}

/// Classify a request path by its prefix. API-style requests get status
/// codes, everything else is treated as interactive.
pub fn classify_path(path: &str, api_prefix: &str) -> RequestStyle {
    if path.starts_with(api_prefix) {
        RequestStyle::Api
    } else {
        RequestStyle::Interactive
    }
}

/// Boundary-level reaction to a denied request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enforcement {
    /// Respond with this HTTP status (401 or 403).
    Status(u16),
    /// Redirect the caller to the login page.
    RedirectToLogin,
    /// Redirect the caller away with a user-facing message.
    RedirectWithMessage(String),
}

impl AccessError {
    /// Map a denial to the reaction the boundary should produce.
    ///
    /// Returns `None` for store failures, which the boundary reports as an
    /// internal error instead.
    pub fn enforcement(&self, style: RequestStyle) -> Option<Enforcement> {
        match (self, style) {
            (AccessError::Unauthenticated, RequestStyle::Api) => Some(Enforcement::Status(401)),
            (AccessError::Unauthenticated, RequestStyle::Interactive) => {
                Some(Enforcement::RedirectToLogin)
            }
            (AccessError::Forbidden { .. }, RequestStyle::Api) => Some(Enforcement::Status(403)),
            (AccessError::Forbidden { resource, action }, RequestStyle::Interactive) => {
                Some(Enforcement::RedirectWithMessage(format!(
                    "Access denied: no permission to {action} {resource}."
                )))
            }
            (AccessError::Store(_), _) => None,
        }
    }
}
