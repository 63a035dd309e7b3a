use axum::Router;
use axum::routing::{delete, get, post, put};

use super::handlers;
use crate::config::GatehouseConfig;
use crate::projects::{InviteRepository, MemberRepository, ProjectRepository};
use crate::{TokenRepository, UserRepository};

/// Shared handler state. `store` backs projects, members and invites.
#[derive(Clone)]
pub struct AppState<U, T, S> {
    pub user_repo: U,
    pub token_repo: T,
    pub store: S,
    pub config: GatehouseConfig,
}

impl<U, T, S> AppState<U, T, S> {
    pub fn new(user_repo: U, token_repo: T, store: S) -> Self {
        Self::with_config(user_repo, token_repo, store, GatehouseConfig::default())
    }

    pub fn with_config(user_repo: U, token_repo: T, store: S, config: GatehouseConfig) -> Self {
        Self {
            user_repo,
            token_repo,
            store,
            config,
        }
    }
}

/// Every route, ready for `.with_state(...)`.
pub fn router<U, T, S>() -> Router<AppState<U, T, S>>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    Router::new()
        .merge(auth_routes())
        .merge(project_routes())
        .merge(invite_routes())
        .merge(member_routes())
}

/// `POST /auth/signup` and `POST /auth/login`, both taking `?inviteToken=`.
pub fn auth_routes<U, T, S>() -> Router<AppState<U, T, S>>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/auth/signup", post(handlers::signup::<U, T, S>))
        .route("/auth/login", post(handlers::login::<U, T, S>))
}

pub fn project_routes<U, T, S>() -> Router<AppState<U, T, S>>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/projects", post(handlers::create_project::<U, T, S>))
        .route(
            "/projects/{id}/invites",
            post(handlers::create_invites::<U, T, S>).get(handlers::list_invites::<U, T, S>),
        )
        .route(
            "/projects/{id}/members",
            get(handlers::list_members::<U, T, S>),
        )
}

/// Invite ids are numeric and tokens alphanumeric, so both share `{key}`.
pub fn invite_routes<U, T, S>() -> Router<AppState<U, T, S>>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/invites/{key}",
            get(handlers::preview_invite::<U, T, S>).delete(handlers::cancel_invite::<U, T, S>),
        )
        .route(
            "/invites/{key}/accept",
            post(handlers::accept_invite::<U, T, S>),
        )
        .route(
            "/invites/{key}/decline",
            post(handlers::decline_invite::<U, T, S>),
        )
        .route(
            "/invites/{key}/resend",
            post(handlers::resend_invite::<U, T, S>),
        )
        .route(
            "/invites/{key}/cancel",
            post(handlers::cancel_invite::<U, T, S>),
        )
}

pub fn member_routes<U, T, S>() -> Router<AppState<U, T, S>>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/members/{id}/role",
            put(handlers::change_member_role::<U, T, S>),
        )
        .route(
            "/members/{id}",
            delete(handlers::remove_member::<U, T, S>),
        )
}
