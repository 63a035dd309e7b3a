use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{Invite, InviteStatus, Member, Project, Role};
use crate::GateError;

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    /// Becomes the project's OWNER member.
    pub owner_user_id: i64,
}

#[derive(Debug, Clone)]
pub struct CreateMember {
    pub project_id: i64,
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CreateInvite {
    pub project_id: i64,
    pub email: String,
    pub role: Role,
    pub message: Option<String>,
    pub inviter_user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of the atomic accept.
#[derive(Debug, Clone)]
pub struct InviteAcceptance {
    pub invite: Invite,
    pub member: Member,
    /// `false` when the user already held a role in the project.
    pub newly_joined: bool,
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Creates the project and its OWNER member in one step.
    async fn create(&self, data: CreateProject) -> Result<(Project, Member), GateError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Project>, GateError>;
    /// Deletes the project with its members and invites.
    async fn delete(&self, id: i64) -> Result<(), GateError>;
}

/// Member rows.
///
/// Every write that depends on a previously read role takes that role as
/// `expected` and fails with `GateError::Conflict` if the row no longer
/// holds it.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Fails with `GateError::AlreadyMember` if `(project_id, user_id)` exists.
    async fn create(&self, data: CreateMember) -> Result<Member, GateError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Member>, GateError>;
    async fn find_by_project_and_user(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Member>, GateError>;
    async fn find_by_project(&self, project_id: i64) -> Result<Vec<Member>, GateError>;
    async fn update_role(&self, id: i64, expected: Role, role: Role) -> Result<Member, GateError>;
    async fn delete(&self, id: i64, expected: Role) -> Result<(), GateError>;
    /// Promotes `to_id` to OWNER and demotes the current owner `from_id` to
    /// ADMIN as one unit. Returns `(new_owner, previous_owner)`.
    async fn transfer_ownership(
        &self,
        from_id: i64,
        to_id: i64,
        to_expected: Role,
    ) -> Result<(Member, Member), GateError>;
}

#[async_trait]
pub trait InviteRepository: Send + Sync {
    /// Fails with `GateError::DuplicatePendingInvite` when a live pending
    /// invite exists for the same project and email at `now`.
    async fn create(&self, data: CreateInvite, now: DateTime<Utc>) -> Result<Invite, GateError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Invite>, GateError>;
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Invite>, GateError>;
    /// Live pending invites, newest first.
    async fn find_pending_by_project(
        &self,
        project_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invite>, GateError>;
    /// Moves a live pending invite to `to`.
    ///
    /// One conditional write: `status = 'pending' AND expires_at >= now`.
    /// Fails with `NotFound`, `Expired` or `InvalidState` otherwise.
    async fn transition(
        &self,
        id: i64,
        to: InviteStatus,
        now: DateTime<Utc>,
    ) -> Result<Invite, GateError>;
    /// Replaces the token and deadline of a pending invite, expired or not.
    async fn refresh(
        &self,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Invite, GateError>;
    /// Marks the invite accepted and adds `user_id` to its project as one unit.
    ///
    /// An existing member row is kept. An OWNER invite makes the user the
    /// owner and demotes the previous owner to ADMIN.
    async fn accept(
        &self,
        id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<InviteAcceptance, GateError>;
    /// Deletes answered invites last touched before `before` and pending
    /// invites that expired before it.
    async fn delete_stale(&self, before: DateTime<Utc>) -> Result<u64, GateError>;
}
