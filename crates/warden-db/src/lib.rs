//! Warden Database — SurrealDB connection management and store
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Store implementations for the `warden-core` repository traits
//! - Error types ([`DbError`])

mod connection;
mod error;
mod schema;

pub mod repository;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
