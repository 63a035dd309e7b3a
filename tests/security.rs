//! Security-focused test suite.
//!
//! Covers credential handling and the invite token as a capability.
//! Run with: `cargo test --features mocks --test security`

#![cfg(feature = "mocks")]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use chrono::{Duration, Utc};
use gatehouse::actions::{LoginAction, SignupAction, SignupInput};
use gatehouse::crypto::{Argon2Hasher, PasswordHasher, generate_token_default, hash_token};
use gatehouse::projects::{
    CreateProject, InviteRepository, InviteRow, InviteService, Member, MembershipService,
    MockProjectStore, ProjectRepository, Role,
};
use gatehouse::{
    GateError, MockTokenRepository, MockUserRepository, SecretString, TokenRepository,
};

// =============================================================================
// Password and token primitives
// =============================================================================

#[test]
fn argon2_produces_different_hashes_for_same_password() {
    let hasher = Argon2Hasher::fast();

    let hash1 = hasher.hash("testpassword123").unwrap();
    let hash2 = hasher.hash("testpassword123").unwrap();

    assert_ne!(hash1, hash2);
    assert!(hasher.verify("testpassword123", &hash1).unwrap());
    assert!(hasher.verify("testpassword123", &hash2).unwrap());
}

#[test]
fn generated_tokens_do_not_repeat() {
    let tokens: std::collections::HashSet<_> = (0..200).map(|_| generate_token_default()).collect();
    assert_eq!(tokens.len(), 200);
}

#[test]
fn token_hash_does_not_contain_token() {
    let token = generate_token_default();
    let hash = hash_token(&token);

    assert!(!hash.contains(&token));
    assert_eq!(hash.len(), 64);
}

#[test]
fn secret_string_redacts_in_debug_and_display() {
    let secret = SecretString::new("invite-token-value");

    assert!(!format!("{secret:?}").contains("invite-token-value"));
    assert!(!format!("{secret}").contains("invite-token-value"));
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn unknown_email_and_wrong_password_fail_the_same_way() {
    let users = MockUserRepository::new();
    let tokens = MockTokenRepository::new();

    SignupAction::with_hasher(users.clone(), tokens.clone(), Argon2Hasher::fast())
        .execute(SignupInput {
            email: "alice@x.com".to_owned(),
            name: "Alice".to_owned(),
            password: SecretString::new("password123"),
        })
        .await
        .unwrap();

    let login = LoginAction::with_hasher(users, tokens, Argon2Hasher::fast());
    let unknown = login
        .execute("nobody@x.com", &SecretString::new("password123"))
        .await
        .unwrap_err();
    let wrong = login
        .execute("alice@x.com", &SecretString::new("password124"))
        .await
        .unwrap_err();

    assert_eq!(unknown, GateError::InvalidCredentials);
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn bearer_tokens_are_stored_hashed() {
    let tokens = MockTokenRepository::new();
    let issued = tokens
        .create_token(1, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    let stored = tokens.tokens.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_ne!(stored[0].token, issued.token);
    assert_eq!(
        stored[0].token.expose_secret(),
        hash_token(issued.token.expose_secret())
    );
}

// =============================================================================
// Invites
// =============================================================================

async fn project() -> (MockProjectStore, Member) {
    let store = MockProjectStore::new();
    let (_, owner) = ProjectRepository::create(
        &store,
        CreateProject {
            name: "Apollo".to_owned(),
            description: None,
            owner_user_id: 1,
        },
    )
    .await
    .unwrap();
    (store, owner)
}

#[tokio::test]
async fn invite_tokens_are_stored_hashed_and_never_serialized() {
    let (store, owner) = project().await;
    let service = InviteService::new(
        MockUserRepository::new(),
        store.clone(),
        store.clone(),
        store.clone(),
    );

    let mut outcome = service
        .create_batch(
            owner.project_id,
            &owner,
            vec![InviteRow {
                email: "bob@x.com".to_owned(),
                role: Role::Member,
                message: None,
            }],
        )
        .await
        .unwrap();
    let issued = outcome.results.remove(0);

    let stored = InviteRepository::find_by_id(&store, issued.invite.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.token_hash, hash_token(issued.token.expose_secret()));

    let json = serde_json::to_string(&stored).unwrap();
    assert!(!json.contains(&stored.token_hash));
    assert!(!json.contains(issued.token.expose_secret()));
}

#[tokio::test]
async fn blank_and_unknown_invite_tokens_are_not_found() {
    let (store, _) = project().await;
    let service = InviteService::new(
        MockUserRepository::new(),
        store.clone(),
        store.clone(),
        store,
    );

    for token in ["", "   ", "not-a-real-token"] {
        let err = service.preview(&SecretString::new(token)).await.unwrap_err();
        assert_eq!(err, GateError::NotFound);
    }
}

#[tokio::test]
async fn member_of_another_project_cannot_act() {
    let (store, owner) = project().await;
    let (_, other_owner) = ProjectRepository::create(
        &store,
        CreateProject {
            name: "Gemini".to_owned(),
            description: None,
            owner_user_id: 2,
        },
    )
    .await
    .unwrap();

    let members = MembershipService::new(store.clone());
    let target = members
        .add_member(owner.project_id, 3, Role::Viewer)
        .await
        .unwrap();

    assert_eq!(
        members
            .change_role(&other_owner, &target, Role::Admin)
            .await
            .unwrap_err(),
        GateError::Forbidden
    );
    assert_eq!(
        members.remove_member(&other_owner, &target).await.unwrap_err(),
        GateError::Forbidden
    );

    let service = InviteService::new(
        MockUserRepository::new(),
        store.clone(),
        store.clone(),
        store,
    );
    let err = service
        .create_batch(
            owner.project_id,
            &other_owner,
            vec![InviteRow {
                email: "x@x.com".to_owned(),
                role: Role::Member,
                message: None,
            }],
        )
        .await
        .unwrap_err();
    assert_eq!(err, GateError::Forbidden);
}
