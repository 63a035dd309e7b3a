//! HTTP handlers for project, invite and member endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::error::AppError;
use super::middleware::AuthenticatedUser;
use super::routes::AppState;
use crate::actions::{CreateProjectAction, CreateProjectInput, LoginAction, SignupAction, SignupInput};
use crate::api::{
    AcceptInviteResponse, AuthResponse, BatchInviteResponse, ChangeRoleRequest,
    CreateInvitesRequest, CreateProjectRequest, InvitePreviewResponse, InviteResponse,
    InviteTokenQuery, IssuedInviteResponse, LoginRequest, MemberResponse, ProjectIdQuery,
    ProjectResponse, SignupRequest,
};
use crate::projects::{
    InviteRepository, InviteService, MemberRepository, MembershipService, ProjectRepository,
};
use crate::{AuthBridge, GateError, SecretString, TokenRepository, UserRepository};

fn invite_service<U, T, S>(state: &AppState<U, T, S>) -> InviteService<U, S, S, S>
where
    U: UserRepository + Clone,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone,
{
    InviteService::with_config(
        state.user_repo.clone(),
        state.store.clone(),
        state.store.clone(),
        state.store.clone(),
        state.config.invites.clone(),
    )
}

fn auth_bridge<U, T, S>(state: &AppState<U, T, S>) -> AuthBridge<U, T, InviteService<U, S, S, S>>
where
    U: UserRepository + Clone,
    T: TokenRepository + Clone,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone,
{
    let sessions = state.config.sessions.clone();
    AuthBridge::new(
        SignupAction::new(state.user_repo.clone(), state.token_repo.clone())
            .with_session_config(sessions.clone()),
        LoginAction::new(state.user_repo.clone(), state.token_repo.clone())
            .with_session_config(sessions),
        invite_service(state),
    )
}

/// Invite ids are numeric. Anything else cannot name an invite.
fn parse_invite_id(key: &str) -> Result<i64, AppError> {
    key.parse().map_err(|_| AppError(GateError::NotFound))
}

/// Register a user, joining the invited project when `inviteToken` is valid.
///
/// POST /auth/signup?inviteToken=
pub async fn signup<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    Query(query): Query<InviteTokenQuery>,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let input = SignupInput {
        email: body.email,
        name: body.name,
        password: body.password,
    };

    let outcome = auth_bridge(&state)
        .signup(input, query.invite_token.as_ref())
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::from(outcome))))
}

/// Authenticate, joining the invited project when `inviteToken` is valid.
///
/// POST /auth/login?inviteToken=
pub async fn login<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    Query(query): Query<InviteTokenQuery>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let outcome = auth_bridge(&state)
        .login(&body.email, &body.password, query.invite_token.as_ref())
        .await?;

    Ok(Json(AuthResponse::from(outcome)))
}

/// POST /projects
pub async fn create_project<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    user: AuthenticatedUser<U, T>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let input = CreateProjectInput {
        name: body.name,
        description: body.description,
    };
    let (project, _owner) = CreateProjectAction::new(state.store)
        .execute(input, user.user().id)
        .await?;

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

/// POST /projects/{id}/invites
pub async fn create_invites<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    user: AuthenticatedUser<U, T>,
    Path(project_id): Path<i64>,
    Json(body): Json<CreateInvitesRequest>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let actor = MembershipService::new(state.store.clone())
        .find_actor(project_id, user.user().id)
        .await?;

    let outcome = invite_service(&state)
        .create_batch(project_id, &actor, body.invites)
        .await?;

    Ok(Json(BatchInviteResponse::from(outcome)))
}

/// GET /projects/{id}/invites
pub async fn list_invites<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    user: AuthenticatedUser<U, T>,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let actor = MembershipService::new(state.store.clone())
        .find_actor(project_id, user.user().id)
        .await?;

    let invites = invite_service(&state)
        .list_pending(project_id, &actor)
        .await?;

    Ok(Json(
        invites
            .into_iter()
            .map(InviteResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Public: the token is the credential.
///
/// GET /invites/{token}
pub async fn preview_invite<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let preview = invite_service(&state)
        .preview(&SecretString::new(token))
        .await?;

    Ok(Json(InvitePreviewResponse::from(preview)))
}

/// POST /invites/{token}/accept
pub async fn accept_invite<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    user: AuthenticatedUser<U, T>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let user = user.into_inner();
    let accepted = invite_service(&state)
        .accept(&SecretString::new(token), user.id, &user.email)
        .await?;

    Ok(Json(AcceptInviteResponse::from(accepted)))
}

/// POST /invites/{token}/decline
pub async fn decline_invite<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    invite_service(&state)
        .decline(&SecretString::new(token))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /invites/{id}/resend
pub async fn resend_invite<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    user: AuthenticatedUser<U, T>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let id = parse_invite_id(&key)?;
    let issued = invite_service(&state).resend(id, user.user().id).await?;

    Ok(Json(IssuedInviteResponse::from(issued)))
}

/// POST /invites/{id}/cancel, DELETE /invites/{id}
pub async fn cancel_invite<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    user: AuthenticatedUser<U, T>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let id = parse_invite_id(&key)?;
    invite_service(&state).cancel(id, user.user().id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /projects/{id}/members
pub async fn list_members<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    user: AuthenticatedUser<U, T>,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let service = MembershipService::new(state.store);
    let actor = service.find_actor(project_id, user.user().id).await?;
    let members = service.list_members(&actor, project_id).await?;

    Ok(Json(
        members
            .into_iter()
            .map(MemberResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// PUT /members/{id}/role
pub async fn change_member_role<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    user: AuthenticatedUser<U, T>,
    Path(member_id): Path<i64>,
    Json(body): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let service = MembershipService::new(state.store);
    let actor = service.find_actor(body.project_id, user.user().id).await?;
    let target = service.get_member(member_id).await?;
    let updated = service.change_role(&actor, &target, body.role).await?;

    Ok(Json(MemberResponse::from(updated)))
}

/// DELETE /members/{id}?projectId=
pub async fn remove_member<U, T, S>(
    State(state): State<AppState<U, T, S>>,
    user: AuthenticatedUser<U, T>,
    Path(member_id): Path<i64>,
    Query(query): Query<ProjectIdQuery>,
) -> Result<impl IntoResponse, AppError>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: ProjectRepository + MemberRepository + InviteRepository + Clone + Send + Sync + 'static,
{
    let service = MembershipService::new(state.store);
    let actor = service.find_actor(query.project_id, user.user().id).await?;
    let target = service.get_member(member_id).await?;
    service.remove_member(&actor, &target).await?;

    Ok(StatusCode::NO_CONTENT)
}
