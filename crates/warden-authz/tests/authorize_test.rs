//! Integration tests for the authorization engine, driven through the
//! real store implementations on in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use warden_authz::{AuthzEngine, Decision};
use warden_core::models::action::CreateAction;
use warden_core::models::permission::{CreatePermission, Permission};
use warden_core::models::resource::CreateResource;
use warden_core::models::role::{CreateRole, Role, UpdateRole};
use warden_core::models::user::{CreateUser, UpdateUser, User};
use warden_core::repository::{
    ActionRepository, PermissionRepository, ResourceRepository, RoleRepository, UserRepository,
};
use warden_db::repository::{
    SurrealActionRepository, SurrealPermissionRepository, SurrealResourceRepository,
    SurrealRoleRepository, SurrealUserRepository,
};

type Db = surrealdb::engine::local::Db;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
    db
}

/// Get-or-create the named resource and action and a permission for the
/// pair.
async fn grant(db: &Surreal<Db>, resource_name: &str, action_name: &str) -> Permission {
    let resource_repo = SurrealResourceRepository::new(db.clone());
    let action_repo = SurrealActionRepository::new(db.clone());
    let permission_repo = SurrealPermissionRepository::new(db.clone());

    let resource = match resource_repo.get_by_name(resource_name).await {
        Ok(resource) => resource,
        Err(_) => resource_repo
            .create(CreateResource {
                name: resource_name.into(),
                description: String::new(),
            })
            .await
            .unwrap(),
    };

    let action = match action_repo.get_by_name(action_name).await {
        Ok(action) => action,
        Err(_) => action_repo
            .create(CreateAction {
                name: action_name.into(),
                description: String::new(),
            })
            .await
            .unwrap(),
    };

    permission_repo
        .create(CreatePermission {
            resource_id: resource.id,
            action_id: action.id,
            description: format!("{resource_name}_{action_name}"),
        })
        .await
        .unwrap()
}

async fn make_user(db: &Surreal<Db>, email: &str) -> User {
    SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            email: email.into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            middle_name: None,
        })
        .await
        .unwrap()
}

async fn make_role(db: &Surreal<Db>, name: &str, permission_ids: Vec<uuid::Uuid>) -> Role {
    SurrealRoleRepository::new(db.clone())
        .create(CreateRole {
            name: name.into(),
            description: String::new(),
            permission_ids,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn editor_can_update_profile_but_not_delete() {
    let db = setup().await;
    let permission = grant(&db, "user_profile", "update").await;
    let role = make_role(&db, "Editor", vec![permission.id]).await;
    let user = make_user(&db, "alice@example.com").await;

    let role_repo = SurrealRoleRepository::new(db.clone());
    role_repo.assign_to_user(user.id, role.id).await.unwrap();

    let engine = AuthzEngine::new(role_repo);

    assert_eq!(
        engine
            .authorize(Some(&user), "user_profile", "update")
            .await
            .unwrap(),
        Decision::Allow
    );
    // No permission record exists for that pair.
    assert_eq!(
        engine
            .authorize(Some(&user), "user_profile", "delete")
            .await
            .unwrap(),
        Decision::Deny
    );
}

#[tokio::test]
async fn union_across_multiple_roles() {
    let db = setup().await;
    let p_update = grant(&db, "user_profile", "update").await;
    let p_view = grant(&db, "report", "view").await;

    let editors = make_role(&db, "Editor", vec![p_update.id]).await;
    let analysts = make_role(&db, "Analyst", vec![p_view.id]).await;

    let alice = make_user(&db, "alice@example.com").await;
    let bob = make_user(&db, "bob@example.com").await;

    let role_repo = SurrealRoleRepository::new(db.clone());
    role_repo.assign_to_user(alice.id, editors.id).await.unwrap();
    role_repo
        .assign_to_user(alice.id, analysts.id)
        .await
        .unwrap();
    role_repo.assign_to_user(bob.id, analysts.id).await.unwrap();

    let engine = AuthzEngine::new(role_repo);

    // Alice draws from both roles; either one granting the pair is
    // sufficient.
    assert_eq!(
        engine
            .authorize(Some(&alice), "user_profile", "update")
            .await
            .unwrap(),
        Decision::Allow
    );
    assert_eq!(
        engine
            .authorize(Some(&alice), "report", "view")
            .await
            .unwrap(),
        Decision::Allow
    );

    // Bob only holds Analyst.
    assert_eq!(
        engine
            .authorize(Some(&bob), "user_profile", "update")
            .await
            .unwrap(),
        Decision::Deny
    );
}

#[tokio::test]
async fn superuser_with_no_roles_allowed_everything() {
    let db = setup().await;
    let user_repo = SurrealUserRepository::new(db.clone());
    let user = make_user(&db, "root@example.com").await;
    let superuser = user_repo
        .update(
            user.id,
            UpdateUser {
                is_superuser: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let engine = AuthzEngine::new(SurrealRoleRepository::new(db));

    assert_eq!(
        engine
            .authorize(Some(&superuser), "anything", "at_all")
            .await
            .unwrap(),
        Decision::Allow
    );
    assert_eq!(
        engine
            .authorize(Some(&superuser), "permissions", "manage")
            .await
            .unwrap(),
        Decision::Allow
    );
}

#[tokio::test]
async fn missing_identity_denied() {
    let db = setup().await;
    let engine = AuthzEngine::new(SurrealRoleRepository::new(db));

    assert_eq!(
        engine
            .authorize(None, "user_profile", "update")
            .await
            .unwrap(),
        Decision::Deny
    );
}

#[tokio::test]
async fn default_role_grants_nothing() {
    let db = setup().await;
    // The registration-default role carries no permissions.
    let role = make_role(&db, "User", vec![]).await;
    let user = make_user(&db, "newbie@example.com").await;

    let role_repo = SurrealRoleRepository::new(db.clone());
    role_repo.assign_to_user(user.id, role.id).await.unwrap();

    let engine = AuthzEngine::new(role_repo);

    assert_eq!(
        engine
            .authorize(Some(&user), "permissions", "manage")
            .await
            .unwrap(),
        Decision::Deny
    );
}

#[tokio::test]
async fn role_edits_take_effect_immediately() {
    let db = setup().await;
    let permission = grant(&db, "user_profile", "update").await;
    let role = make_role(&db, "Editor", vec![]).await;
    let user = make_user(&db, "alice@example.com").await;

    let role_repo = SurrealRoleRepository::new(db.clone());
    role_repo.assign_to_user(user.id, role.id).await.unwrap();

    let engine = AuthzEngine::new(SurrealRoleRepository::new(db.clone()));

    assert_eq!(
        engine
            .authorize(Some(&user), "user_profile", "update")
            .await
            .unwrap(),
        Decision::Deny
    );

    // Grant through a separate handle; the same engine must observe it on
    // the next query.
    role_repo
        .update(
            role.id,
            UpdateRole {
                permission_ids: Some(vec![permission.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        engine
            .authorize(Some(&user), "user_profile", "update")
            .await
            .unwrap(),
        Decision::Allow
    );
}

#[tokio::test]
async fn clearing_role_permissions_revokes_access() {
    let db = setup().await;
    let permission = grant(&db, "user_profile", "update").await;
    let role = make_role(&db, "Editor", vec![permission.id]).await;
    let user = make_user(&db, "alice@example.com").await;

    let role_repo = SurrealRoleRepository::new(db.clone());
    role_repo.assign_to_user(user.id, role.id).await.unwrap();

    let engine = AuthzEngine::new(SurrealRoleRepository::new(db));

    assert_eq!(
        engine
            .authorize(Some(&user), "user_profile", "update")
            .await
            .unwrap(),
        Decision::Allow
    );

    role_repo
        .update(
            role.id,
            UpdateRole {
                permission_ids: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        engine
            .authorize(Some(&user), "user_profile", "update")
            .await
            .unwrap(),
        Decision::Deny
    );
}

#[tokio::test]
async fn deleting_resource_revokes_access() {
    let db = setup().await;
    let permission = grant(&db, "user_profile", "update").await;
    let role = make_role(&db, "Editor", vec![permission.id]).await;
    let user = make_user(&db, "alice@example.com").await;

    let role_repo = SurrealRoleRepository::new(db.clone());
    role_repo.assign_to_user(user.id, role.id).await.unwrap();

    let engine = AuthzEngine::new(SurrealRoleRepository::new(db.clone()));

    assert_eq!(
        engine
            .authorize(Some(&user), "user_profile", "update")
            .await
            .unwrap(),
        Decision::Allow
    );

    // Cascade: the resource takes its only permission with it.
    let resource_repo = SurrealResourceRepository::new(db.clone());
    let resource = resource_repo.get_by_name("user_profile").await.unwrap();
    resource_repo.delete(resource.id).await.unwrap();

    assert!(role_repo.get_permissions(role.id).await.unwrap().is_empty());
    assert_eq!(
        engine
            .authorize(Some(&user), "user_profile", "update")
            .await
            .unwrap(),
        Decision::Deny
    );
}

#[tokio::test]
async fn effective_permissions_unions_and_dedups() {
    let db = setup().await;
    let p1 = grant(&db, "user_profile", "update").await;
    let p2 = grant(&db, "user_profile", "delete").await;
    let p3 = grant(&db, "report", "view").await;

    // p1 appears in both roles; the union reports it once.
    let editors = make_role(&db, "Editor", vec![p1.id, p2.id]).await;
    let analysts = make_role(&db, "Analyst", vec![p1.id, p3.id]).await;

    let user = make_user(&db, "alice@example.com").await;
    let role_repo = SurrealRoleRepository::new(db.clone());
    role_repo.assign_to_user(user.id, editors.id).await.unwrap();
    role_repo
        .assign_to_user(user.id, analysts.id)
        .await
        .unwrap();

    let engine = AuthzEngine::new(role_repo);

    let effective = engine.effective_permissions(&user).await.unwrap();
    let ids: std::collections::HashSet<_> = effective.iter().map(|p| p.id).collect();

    assert_eq!(effective.len(), 3);
    assert_eq!(
        ids,
        std::collections::HashSet::from([p1.id, p2.id, p3.id])
    );
}

#[tokio::test]
async fn soft_deleted_superuser_still_allowed() {
    // Reference behavior: the superuser override does not consult
    // account state. Boundaries wanting stricter policy check
    // `is_active`/`deleted_at` themselves.
    let db = setup().await;
    let user_repo = SurrealUserRepository::new(db.clone());
    let user = make_user(&db, "root@example.com").await;
    user_repo
        .update(
            user.id,
            UpdateUser {
                is_superuser: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let deleted = user_repo.soft_delete(user.id).await.unwrap();
    assert!(!deleted.is_active);

    let engine = AuthzEngine::new(SurrealRoleRepository::new(db));

    assert_eq!(
        engine
            .authorize(Some(&deleted), "permissions", "manage")
            .await
            .unwrap(),
        Decision::Allow
    );
}
