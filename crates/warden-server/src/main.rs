//! Warden Server — application entry point.

use tracing_subscriber::EnvFilter;
use warden_authz::seed_manage_capability;
use warden_db::repository::{
    SurrealActionRepository, SurrealPermissionRepository, SurrealResourceRepository,
};
use warden_db::{DbConfig, DbManager};

fn db_config_from_env() -> DbConfig {
    let defaults = DbConfig::default();
    DbConfig {
        url: std::env::var("WARDEN_DB_URL").unwrap_or(defaults.url),
        namespace: std::env::var("WARDEN_DB_NAMESPACE").unwrap_or(defaults.namespace),
        database: std::env::var("WARDEN_DB_NAME").unwrap_or(defaults.database),
        username: std::env::var("WARDEN_DB_USER").unwrap_or(defaults.username),
        password: std::env::var("WARDEN_DB_PASS").unwrap_or(defaults.password),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("warden=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Warden server...");

    let config = db_config_from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(e) = warden_db::run_migrations(manager.client()).await {
        tracing::error!(error = %e, "failed to run migrations");
        std::process::exit(1);
    }

    let resources = SurrealResourceRepository::new(manager.client().clone());
    let actions = SurrealActionRepository::new(manager.client().clone());
    let permissions = SurrealPermissionRepository::new(manager.client().clone());

    match seed_manage_capability(&resources, &actions, &permissions).await {
        Ok(permission) => {
            tracing::info!(permission_id = %permission.id, "management capability ready");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to seed management capability");
            std::process::exit(1);
        }
    }

    // TODO: mount the HTTP boundary (admin API and user views) on top of
    // the gate once the web layer lands.

    tracing::info!("Warden server stopped.");
}
