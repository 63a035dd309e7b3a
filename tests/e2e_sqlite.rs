// these tests use #[serial] to run sequentially because setup_db() recreates
// the database each time. without serial, parallel tests would interfere
// with each other's data.
#![allow(clippy::indexing_slicing)]

//! End-to-end tests for `SQLite` repositories.
//!
//! These tests use an in-memory `SQLite` database.
//! Run with: `cargo test --features sqlx_sqlite --test e2e_sqlite`

#![cfg(feature = "sqlx_sqlite")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gatehouse::actions::{CreateProjectAction, CreateProjectInput};
use gatehouse::projects::{
    CreateInvite, CreateMember, InviteRepository, InviteRow, InviteService, InviteStatus, Member,
    MemberRepository, MembershipService, ProjectRepository, Role,
};
use gatehouse::sqlite::{
    SqliteProjectStore, SqliteTokenRepository, SqliteUserRepository, create_repositories,
    migrations,
};
use gatehouse::{GateError, TokenRepository, UserRepository};
use serial_test::serial;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory SQLite database");

    migrations::run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

async fn setup() -> (
    SqlitePool,
    SqliteUserRepository,
    SqliteTokenRepository,
    SqliteProjectStore,
) {
    let pool = setup_db().await;
    let (users, tokens, store) = create_repositories(pool.clone());
    (pool, users, tokens, store)
}

async fn project_with_owner(store: &SqliteProjectStore, owner_user_id: i64) -> Member {
    let (_, owner) = CreateProjectAction::new(store.clone())
        .execute(
            CreateProjectInput {
                name: "Apollo".to_owned(),
                description: None,
            },
            owner_user_id,
        )
        .await
        .expect("Failed to create project");
    owner
}

fn pending_invite(project_id: i64, email: &str, token_hash: &str, expires_at: DateTime<Utc>) -> CreateInvite {
    CreateInvite {
        project_id,
        email: email.to_owned(),
        role: Role::Member,
        message: None,
        inviter_user_id: 1,
        token_hash: token_hash.to_owned(),
        expires_at,
    }
}

#[tokio::test]
#[serial]
async fn test_migrations_are_idempotent() {
    let pool = setup_db().await;
    migrations::run(&pool).await.expect("second run failed");

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _gatehouse_migrations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(applied, i64::try_from(migrations::names().count()).unwrap());
}

#[tokio::test]
#[serial]
async fn test_user_and_token_repositories() {
    let (_pool, users, tokens, _) = setup().await;

    let user = users
        .create_user("test@example.com", "Test", "hashedpassword123")
        .await
        .expect("Failed to create user");
    assert!(user.id > 0);

    let err = users
        .create_user("TEST@example.com", "Other", "hash")
        .await
        .unwrap_err();
    assert_eq!(err, GateError::UserAlreadyExists);

    let found = users
        .find_user_by_email("test@example.com")
        .await
        .unwrap()
        .expect("User not found");
    assert_eq!(found.id, user.id);

    let token = tokens
        .create_token(user.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    let found = tokens
        .find_token(token.token.expose_secret())
        .await
        .unwrap()
        .expect("Token not found");
    assert_eq!(found.user_id, user.id);

    tokens.revoke_token(token.token.expose_secret()).await.unwrap();
    assert!(
        tokens
            .find_token(token.token.expose_secret())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn test_prune_expired_tokens() {
    let (_pool, users, tokens, _) = setup().await;
    let user = users.create_user("a@x.com", "A", "hash").await.unwrap();

    tokens
        .create_token(user.id, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    tokens
        .create_token(user.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(tokens.prune_expired().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn test_project_member_constraints() {
    let (_pool, _, _, store) = setup().await;
    let owner = project_with_owner(&store, 1).await;

    let member = MemberRepository::create(
        &store,
        CreateMember {
            project_id: owner.project_id,
            user_id: 2,
            role: Role::Member,
        },
    )
    .await
    .unwrap();

    let dup = MemberRepository::create(
        &store,
        CreateMember {
            project_id: owner.project_id,
            user_id: 2,
            role: Role::Viewer,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(dup, GateError::AlreadyMember);

    let missing = MemberRepository::create(
        &store,
        CreateMember {
            project_id: 9999,
            user_id: 2,
            role: Role::Viewer,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(missing, GateError::NotFound);

    // stale expected role
    let err = store
        .update_role(member.id, Role::Admin, Role::Viewer)
        .await
        .unwrap_err();
    assert_eq!(err, GateError::Conflict);

    let updated = store
        .update_role(member.id, Role::Member, Role::Admin)
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Admin);

    // a second owner is refused by the partial unique index
    let err = store
        .update_role(member.id, Role::Admin, Role::Owner)
        .await
        .unwrap_err();
    assert_eq!(err, GateError::Conflict);
}

#[tokio::test]
#[serial]
async fn test_project_delete_cascades() {
    let (pool, _, _, store) = setup().await;
    let owner = project_with_owner(&store, 1).await;
    InviteRepository::create(
        &store,
        pending_invite(owner.project_id, "a@x.com", "h1", Utc::now() + Duration::days(1)),
        Utc::now(),
    )
    .await
    .unwrap();

    ProjectRepository::delete(&store, owner.project_id)
        .await
        .unwrap();

    let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_members")
        .fetch_one(&pool)
        .await
        .unwrap();
    let invites: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_invites")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((members, invites), (0, 0));
}

#[tokio::test]
#[serial]
async fn test_ownership_transfer_is_atomic() {
    let (_pool, _, _, store) = setup().await;
    let owner = project_with_owner(&store, 1).await;
    let service = MembershipService::new(store.clone());

    let mut admins = Vec::new();
    for user_id in 10..30 {
        admins.push(
            service
                .add_member(owner.project_id, user_id, Role::Admin)
                .await
                .unwrap(),
        );
    }

    let mut handles = Vec::new();
    for target in admins {
        let service = MembershipService::new(store.clone());
        let owner = owner.clone();
        handles.push(tokio::spawn(async move {
            service.change_role(&owner, &target, Role::Owner).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert_eq!(err, GateError::Conflict),
        }
    }
    assert_eq!(succeeded, 1);

    let owners = store
        .find_by_project(owner.project_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.role == Role::Owner)
        .count();
    assert_eq!(owners, 1);
}

#[tokio::test]
#[serial]
async fn test_invite_duplicate_and_expiry() {
    let (pool, _, _, store) = setup().await;
    let owner = project_with_owner(&store, 1).await;
    let now = Utc::now();

    let first = InviteRepository::create(
        &store,
        pending_invite(owner.project_id, "bob@x.com", "h1", now + Duration::days(1)),
        now,
    )
    .await
    .unwrap();

    let err = InviteRepository::create(
        &store,
        pending_invite(owner.project_id, "bob@x.com", "h2", now + Duration::days(1)),
        now,
    )
    .await
    .unwrap_err();
    assert_eq!(err, GateError::DuplicatePendingInvite);

    sqlx::query("UPDATE project_invites SET expires_at = ? WHERE id = ?")
        .bind(now - Duration::minutes(1))
        .bind(first.id)
        .execute(&pool)
        .await
        .unwrap();

    // a lapsed invite no longer blocks a new one
    InviteRepository::create(
        &store,
        pending_invite(owner.project_id, "bob@x.com", "h3", now + Duration::days(1)),
        Utc::now(),
    )
    .await
    .unwrap();

    let err = store
        .transition(first.id, InviteStatus::Declined, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err, GateError::Expired);

    let pending = store
        .find_pending_by_project(owner.project_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].token_hash, "h3");

    assert_eq!(store.delete_stale(Utc::now()).await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn test_invite_accept_flow() {
    let (_pool, users, _, store) = setup().await;
    let alice = users.create_user("alice@x.com", "Alice", "hash").await.unwrap();
    let bob = users.create_user("bob@x.com", "Bob", "hash").await.unwrap();
    let owner = project_with_owner(&store, alice.id).await;

    let service = InviteService::new(users.clone(), store.clone(), store.clone(), store.clone());
    let mut outcome = service
        .create_batch(
            owner.project_id,
            &owner,
            vec![
                InviteRow {
                    email: "Bob@X.com".to_owned(),
                    role: Role::Admin,
                    message: Some("  join us  ".to_owned()),
                },
                InviteRow {
                    email: "alice@x.com".to_owned(),
                    role: Role::Member,
                    message: None,
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].error, GateError::AlreadyMember);

    let issued = outcome.results.remove(0);
    assert_eq!(issued.invite.email, "bob@x.com");
    assert_eq!(issued.invite.message.as_deref(), Some("join us"));

    let preview = service.preview(&issued.token).await.unwrap();
    assert_eq!(preview.project.name, "Apollo");
    assert_eq!(preview.inviter.unwrap().id, alice.id);

    let accepted = service
        .accept(&issued.token, bob.id, &bob.email)
        .await
        .unwrap();
    assert!(accepted.newly_joined);
    assert_eq!(accepted.member.role, Role::Admin);

    let again = service
        .accept(&issued.token, bob.id, &bob.email)
        .await
        .unwrap();
    assert!(!again.newly_joined);
    assert_eq!(again.member.id, accepted.member.id);

    let invite = service.store().find(issued.invite.id).await.unwrap();
    assert_eq!(invite.status, InviteStatus::Accepted);
    assert_eq!(invite.accepted_by, Some(bob.id));

    let err = service.decline(&issued.token).await.unwrap_err();
    assert_eq!(err, GateError::InvalidState);
}

#[tokio::test]
#[serial]
async fn test_owner_invite_accept_transfers_ownership() {
    let (_pool, users, _, store) = setup().await;
    let alice = users.create_user("alice@x.com", "Alice", "hash").await.unwrap();
    let bob = users.create_user("bob@x.com", "Bob", "hash").await.unwrap();
    let owner = project_with_owner(&store, alice.id).await;

    let service = InviteService::new(users.clone(), store.clone(), store.clone(), store.clone());
    let mut outcome = service
        .create_batch(
            owner.project_id,
            &owner,
            vec![InviteRow {
                email: "bob@x.com".to_owned(),
                role: Role::Owner,
                message: None,
            }],
        )
        .await
        .unwrap();
    let issued = outcome.results.remove(0);

    let accepted = service
        .accept(&issued.token, bob.id, &bob.email)
        .await
        .unwrap();
    assert_eq!(accepted.member.role, Role::Owner);

    let previous = MemberRepository::find_by_id(&store, owner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(previous.role, Role::Admin);
}

#[tokio::test]
#[serial]
async fn test_owner_invite_void_once_inviter_hands_off() {
    let (_pool, users, _, store) = setup().await;
    let alice = users.create_user("alice@x.com", "Alice", "hash").await.unwrap();
    let carol = users.create_user("carol@x.com", "Carol", "hash").await.unwrap();
    let alt = users.create_user("alt@x.com", "Alt", "hash").await.unwrap();
    let owner = project_with_owner(&store, alice.id).await;

    let service = InviteService::new(users.clone(), store.clone(), store.clone(), store.clone());
    let mut outcome = service
        .create_batch(
            owner.project_id,
            &owner,
            vec![InviteRow {
                email: alt.email.clone(),
                role: Role::Owner,
                message: None,
            }],
        )
        .await
        .unwrap();
    let issued = outcome.results.remove(0);

    let members = MembershipService::new(store.clone());
    let carol_member = members
        .add_member(owner.project_id, carol.id, Role::Admin)
        .await
        .unwrap();
    members
        .change_role(&owner, &carol_member, Role::Owner)
        .await
        .unwrap();

    let err = service
        .accept(&issued.token, alt.id, &alt.email)
        .await
        .unwrap_err();
    assert_eq!(err, GateError::Forbidden);

    let carol_now = MemberRepository::find_by_id(&store, carol_member.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(carol_now.role, Role::Owner);
    assert!(
        store
            .find_by_project_and_user(owner.project_id, alt.id)
            .await
            .unwrap()
            .is_none()
    );

    // the rolled back accept leaves the invite pending
    let invite = service.store().find(issued.invite.id).await.unwrap();
    assert_eq!(invite.status, InviteStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_concurrent_accepts_create_one_member() {
    let (_pool, users, _, store) = setup().await;
    let alice = users.create_user("alice@x.com", "Alice", "hash").await.unwrap();
    let bob = users.create_user("bob@x.com", "Bob", "hash").await.unwrap();
    let dave = users.create_user("dave@x.com", "Dave", "hash").await.unwrap();
    let owner = project_with_owner(&store, alice.id).await;

    let service = Arc::new(InviteService::new(
        users.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let mut outcome = service
        .create_batch(
            owner.project_id,
            &owner,
            vec![InviteRow {
                email: bob.email.clone(),
                role: Role::Member,
                message: None,
            }],
        )
        .await
        .unwrap();
    let issued = outcome.results.remove(0);

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = Arc::clone(&service);
        let token = issued.token.clone();
        let user_id = if i % 2 == 0 { bob.id } else { dave.id };
        handles.push(tokio::spawn(async move {
            (user_id, service.accept(&token, user_id, "bob@x.com").await)
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let winners: Vec<i64> = results
        .iter()
        .filter(|(_, r)| r.as_ref().is_ok_and(|a| a.newly_joined))
        .map(|(user_id, _)| *user_id)
        .collect();
    assert_eq!(winners.len(), 1);
    let winner = winners[0];

    for (user_id, result) in &results {
        if *user_id == winner {
            assert_eq!(result.as_ref().unwrap().member.user_id, winner);
        } else {
            assert_eq!(result.as_ref().unwrap_err(), &GateError::InvalidState);
        }
    }

    let members = store.find_by_project(owner.project_id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().any(|m| m.user_id == winner));

    let invite = service.store().find(issued.invite.id).await.unwrap();
    assert_eq!(invite.status, InviteStatus::Accepted);
    assert_eq!(invite.accepted_by, Some(winner));
}

#[tokio::test]
#[serial]
async fn test_resend_rotates_token() {
    let (_pool, users, _, store) = setup().await;
    let alice = users.create_user("alice@x.com", "Alice", "hash").await.unwrap();
    let owner = project_with_owner(&store, alice.id).await;

    let service = InviteService::new(users.clone(), store.clone(), store.clone(), store.clone());
    let mut outcome = service
        .create_batch(
            owner.project_id,
            &owner,
            vec![InviteRow {
                email: "bob@x.com".to_owned(),
                role: Role::Viewer,
                message: None,
            }],
        )
        .await
        .unwrap();
    let issued = outcome.results.remove(0);

    let resent = service.resend(issued.invite.id, alice.id).await.unwrap();
    assert_ne!(resent.token, issued.token);
    assert_eq!(
        service.preview(&issued.token).await.unwrap_err(),
        GateError::NotFound
    );
    service.preview(&resent.token).await.unwrap();

    service.cancel(issued.invite.id, alice.id).await.unwrap();
    assert_eq!(
        service.cancel(issued.invite.id, alice.id).await.unwrap_err(),
        GateError::InvalidState
    );
}
