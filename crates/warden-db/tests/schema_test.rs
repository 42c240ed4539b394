//! Schema and migration runner tests using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn migrations_apply_cleanly() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    warden_db::run_migrations(&db).await.unwrap();
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    warden_db::run_migrations(&db).await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
}

#[test]
fn schema_v1_defines_core_tables() {
    let ddl = warden_db::schema_v1();
    for table in ["resource", "action", "permission", "role", "user"] {
        assert!(
            ddl.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
            "missing table definition for {table}"
        );
    }
    assert!(ddl.contains("DEFINE TABLE has_role TYPE RELATION"));
    assert!(ddl.contains("DEFINE TABLE grants TYPE RELATION"));
}
