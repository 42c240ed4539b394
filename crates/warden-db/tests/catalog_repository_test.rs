//! Integration tests for the catalog stores (resources, actions,
//! permissions) using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use warden_core::error::WardenError;
use warden_core::models::action::{Action, CreateAction};
use warden_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use warden_core::models::resource::{CreateResource, Resource, UpdateResource};
use warden_core::models::role::CreateRole;
use warden_core::repository::{
    ActionRepository, Pagination, PermissionRepository, ResourceRepository, RoleRepository,
};
use warden_db::repository::{
    SurrealActionRepository, SurrealPermissionRepository, SurrealResourceRepository,
    SurrealRoleRepository,
};

type Db = surrealdb::engine::local::Db;

/// Spin up an in-memory database with the schema applied.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
    db
}

/// Helper: create a (resource, action, permission) triple.
async fn seed_permission(
    db: &Surreal<Db>,
    resource_name: &str,
    action_name: &str,
) -> (Resource, Action, Permission) {
    let resource_repo = SurrealResourceRepository::new(db.clone());
    let action_repo = SurrealActionRepository::new(db.clone());
    let permission_repo = SurrealPermissionRepository::new(db.clone());

    let resource = resource_repo
        .create(CreateResource {
            name: resource_name.into(),
            description: format!("{resource_name} records"),
        })
        .await
        .unwrap();

    let action = action_repo
        .create(CreateAction {
            name: action_name.into(),
            description: format!("{action_name} operation"),
        })
        .await
        .unwrap();

    let permission = permission_repo
        .create(CreatePermission {
            resource_id: resource.id,
            action_id: action.id,
            description: format!("{resource_name}_{action_name}"),
        })
        .await
        .unwrap();

    (resource, action, permission)
}

// ---------------------------------------------------------------------------
// Resource tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_resource() {
    let db = setup().await;
    let repo = SurrealResourceRepository::new(db);

    let resource = repo
        .create(CreateResource {
            name: "user_profile".into(),
            description: "Profile records".into(),
        })
        .await
        .unwrap();

    assert_eq!(resource.name, "user_profile");

    let by_id = repo.get_by_id(resource.id).await.unwrap();
    assert_eq!(by_id.id, resource.id);

    let by_name = repo.get_by_name("user_profile").await.unwrap();
    assert_eq!(by_name.id, resource.id);
    assert_eq!(by_name.description, "Profile records");
}

#[tokio::test]
async fn duplicate_resource_name_rejected() {
    let db = setup().await;
    let repo = SurrealResourceRepository::new(db);

    repo.create(CreateResource {
        name: "invoice".into(),
        description: "first".into(),
    })
    .await
    .unwrap();

    let err = repo
        .create(CreateResource {
            name: "invoice".into(),
            description: "second".into(),
        })
        .await
        .unwrap_err();

    assert!(
        matches!(err, WardenError::DuplicateName { .. }),
        "expected DuplicateName, got: {err:?}"
    );
}

#[tokio::test]
async fn empty_resource_name_rejected() {
    let db = setup().await;
    let repo = SurrealResourceRepository::new(db);

    let err = repo
        .create(CreateResource {
            name: String::new(),
            description: "nameless".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::Validation { .. }));
}

#[tokio::test]
async fn update_resource_keeps_unset_fields() {
    let db = setup().await;
    let repo = SurrealResourceRepository::new(db);

    let resource = repo
        .create(CreateResource {
            name: "report".into(),
            description: "Reports".into(),
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            resource.id,
            UpdateResource {
                name: Some("report_v2".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "report_v2");
    assert_eq!(updated.description, "Reports"); // unchanged
}

#[tokio::test]
async fn rename_resource_to_taken_name_rejected() {
    let db = setup().await;
    let repo = SurrealResourceRepository::new(db);

    repo.create(CreateResource {
        name: "alpha".into(),
        description: String::new(),
    })
    .await
    .unwrap();
    let beta = repo
        .create(CreateResource {
            name: "beta".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let err = repo
        .update(
            beta.id,
            UpdateResource {
                name: Some("alpha".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::DuplicateName { .. }));
}

#[tokio::test]
async fn list_resources_with_pagination() {
    let db = setup().await;
    let repo = SurrealResourceRepository::new(db);

    for i in 0..5 {
        repo.create(CreateResource {
            name: format!("resource-{i}"),
            description: String::new(),
        })
        .await
        .unwrap();
    }

    let page1 = repo
        .list(Pagination {
            offset: 0,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(page1.items.len(), 3);
    assert_eq!(page1.total, 5);

    let page2 = repo
        .list(Pagination {
            offset: 3,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 2);
}

// ---------------------------------------------------------------------------
// Action tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_action() {
    let db = setup().await;
    let repo = SurrealActionRepository::new(db);

    let action = repo
        .create(CreateAction {
            name: "update".into(),
            description: "Modify a record".into(),
        })
        .await
        .unwrap();

    let fetched = repo.get_by_name("update").await.unwrap();
    assert_eq!(fetched.id, action.id);
}

#[tokio::test]
async fn duplicate_action_name_rejected() {
    let db = setup().await;
    let repo = SurrealActionRepository::new(db);

    repo.create(CreateAction {
        name: "manage".into(),
        description: "first".into(),
    })
    .await
    .unwrap();

    let err = repo
        .create(CreateAction {
            name: "manage".into(),
            description: "second".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::DuplicateName { .. }));
}

// ---------------------------------------------------------------------------
// Permission tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn permission_requires_existing_refs() {
    let db = setup().await;
    let permission_repo = SurrealPermissionRepository::new(db.clone());
    let resource_repo = SurrealResourceRepository::new(db);

    let resource = resource_repo
        .create(CreateResource {
            name: "user_profile".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let err = permission_repo
        .create(CreatePermission {
            resource_id: resource.id,
            action_id: uuid::Uuid::new_v4(),
            description: String::new(),
        })
        .await
        .unwrap_err();

    assert!(
        matches!(err, WardenError::UnknownReference { ref entity, .. } if entity == "action"),
        "expected UnknownReference for action, got: {err:?}"
    );
}

#[tokio::test]
async fn duplicate_permission_pair_rejected() {
    let db = setup().await;
    let (resource, action, _) = seed_permission(&db, "user_profile", "update").await;
    let repo = SurrealPermissionRepository::new(db);

    let err = repo
        .create(CreatePermission {
            resource_id: resource.id,
            action_id: action.id,
            description: "again".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::DuplicateName { .. }));
}

#[tokio::test]
async fn permission_lookup_by_pair() {
    let db = setup().await;
    let (resource, action, permission) = seed_permission(&db, "user_profile", "update").await;
    let repo = SurrealPermissionRepository::new(db);

    let fetched = repo.get_by_pair(resource.id, action.id).await.unwrap();
    assert_eq!(fetched.id, permission.id);

    let err = repo
        .get_by_pair(resource.id, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::UnknownReference { .. }));
}

#[tokio::test]
async fn update_permission_repoints_pair() {
    let db = setup().await;
    let (resource, _, permission) = seed_permission(&db, "user_profile", "update").await;
    let action_repo = SurrealActionRepository::new(db.clone());
    let permission_repo = SurrealPermissionRepository::new(db);

    let delete_action = action_repo
        .create(CreateAction {
            name: "delete".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let updated = permission_repo
        .update(
            permission.id,
            UpdatePermission {
                action_id: Some(delete_action.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.action_id, delete_action.id);
    assert_eq!(updated.resource_id, resource.id);

    // The freed pair can be taken again, but repointing onto an occupied
    // pair is rejected.
    let second = permission_repo
        .create(CreatePermission {
            resource_id: resource.id,
            action_id: permission.action_id,
            description: String::new(),
        })
        .await
        .unwrap();

    let err = permission_repo
        .update(
            second.id,
            UpdatePermission {
                action_id: Some(delete_action.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::DuplicateName { .. }));
}

// ---------------------------------------------------------------------------
// Cascade tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_resource_cascades_to_permissions() {
    let db = setup().await;
    let (resource, action, permission) = seed_permission(&db, "user_profile", "update").await;

    let role_repo = SurrealRoleRepository::new(db.clone());
    let role = role_repo
        .create(CreateRole {
            name: "Editor".into(),
            description: String::new(),
            permission_ids: vec![permission.id],
        })
        .await
        .unwrap();

    let resource_repo = SurrealResourceRepository::new(db.clone());
    resource_repo.delete(resource.id).await.unwrap();

    let permission_repo = SurrealPermissionRepository::new(db.clone());
    let err = permission_repo.get_by_id(permission.id).await.unwrap_err();
    assert!(matches!(err, WardenError::UnknownReference { .. }));

    // The role lost its grant transitively; the action survives.
    let remaining = role_repo.get_permissions(role.id).await.unwrap();
    assert!(remaining.is_empty());

    let action_repo = SurrealActionRepository::new(db);
    assert!(action_repo.get_by_id(action.id).await.is_ok());
}

#[tokio::test]
async fn delete_action_cascades_to_permissions() {
    let db = setup().await;
    let (resource, action, permission) = seed_permission(&db, "user_profile", "update").await;

    let action_repo = SurrealActionRepository::new(db.clone());
    action_repo.delete(action.id).await.unwrap();

    let permission_repo = SurrealPermissionRepository::new(db.clone());
    assert!(permission_repo.get_by_id(permission.id).await.is_err());

    let resource_repo = SurrealResourceRepository::new(db);
    assert!(resource_repo.get_by_id(resource.id).await.is_ok());
}

#[tokio::test]
async fn delete_permission_removes_role_grants() {
    let db = setup().await;
    let (_, _, permission) = seed_permission(&db, "user_profile", "update").await;

    let role_repo = SurrealRoleRepository::new(db.clone());
    let role = role_repo
        .create(CreateRole {
            name: "Editor".into(),
            description: String::new(),
            permission_ids: vec![permission.id],
        })
        .await
        .unwrap();

    let permission_repo = SurrealPermissionRepository::new(db);
    permission_repo.delete(permission.id).await.unwrap();

    let remaining = role_repo.get_permissions(role.id).await.unwrap();
    assert!(remaining.is_empty());
}
