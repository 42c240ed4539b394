//! Warden Authz — the authorization decision engine, the access gate
//! guarding protected operations, and the capability-gated management
//! and account-lifecycle services.

pub mod account;
pub mod admin;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;

pub use account::{AccountService, Registration};
pub use admin::{ManagementService, seed_manage_capability};
pub use config::AuthzConfig;
pub use engine::{AuthzEngine, Decision};
pub use error::AccessError;
pub use gate::{Enforcement, Gate, RequestStyle, classify_path};
