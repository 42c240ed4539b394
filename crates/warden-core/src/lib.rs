//! Warden Core — domain models, store trait definitions, and the shared
//! error taxonomy for the Warden access-control system.

pub mod error;
pub mod models;
pub mod repository;
