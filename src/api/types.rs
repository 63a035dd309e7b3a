use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::projects::{
    AcceptedInvite, BatchInviteOutcome, Invite, InvitePreview, InviteRow, InviteStatus,
    InviterSummary, IssuedInvite, Member, Project, ProjectSummary, Role,
};
use crate::{AuthOutcome, AuthUser, GateError, SecretString};

// Request DTOs

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: SecretString,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
}

/// `?inviteToken=` on signup and login.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteTokenQuery {
    pub invite_token: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitesRequest {
    pub invites: Vec<InviteRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub role: Role,
    pub project_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIdQuery {
    pub project_id: i64,
}

// Response DTOs

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<AuthUser> for UserResponse {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_accepted_project: Option<ProjectResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("auto_accepted_project", &self.auto_accepted_project)
            .finish_non_exhaustive()
    }
}

impl From<AuthOutcome> for AuthResponse {
    fn from(outcome: AuthOutcome) -> Self {
        Self {
            user: UserResponse::from(outcome.user),
            token: outcome.token.token,
            expires_at: outcome.token.expires_at,
            auto_accepted_project: outcome.auto_accepted_project.map(ProjectResponse::from),
            warning: outcome
                .email_mismatch
                .then_some(crate::projects::EMAIL_MISMATCH_WARNING),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            created_at: project.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            project_id: member.project_id,
            user_id: member.user_id,
            role: member.role,
            created_at: member.created_at,
        }
    }
}

/// An invite as seen by project managers. `status` is the effective one,
/// so a lapsed pending invite reads `EXPIRED`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub id: i64,
    pub project_id: i64,
    pub email: String,
    pub role: Role,
    pub message: Option<String>,
    pub status: InviteStatus,
    pub inviter_user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Invite> for InviteResponse {
    fn from(invite: Invite) -> Self {
        Self {
            status: invite.effective_status(Utc::now()),
            id: invite.id,
            project_id: invite.project_id,
            email: invite.email,
            role: invite.role,
            message: invite.message,
            inviter_user_id: invite.inviter_user_id,
            expires_at: invite.expires_at,
            created_at: invite.created_at,
        }
    }
}

/// A freshly issued or resent invite, the only place the plain token appears.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedInviteResponse {
    #[serde(flatten)]
    pub invite: InviteResponse,
    pub token: SecretString,
}

impl std::fmt::Debug for IssuedInviteResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedInviteResponse")
            .field("invite", &self.invite)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl From<IssuedInvite> for IssuedInviteResponse {
    fn from(issued: IssuedInvite) -> Self {
        Self {
            invite: InviteResponse::from(issued.invite),
            token: issued.token,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInviteErrorResponse {
    pub email: String,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInviteResponse {
    pub results: Vec<IssuedInviteResponse>,
    pub errors: Vec<BatchInviteErrorResponse>,
}

impl From<BatchInviteOutcome> for BatchInviteResponse {
    fn from(outcome: BatchInviteOutcome) -> Self {
        Self {
            results: outcome
                .results
                .into_iter()
                .map(IssuedInviteResponse::from)
                .collect(),
            errors: outcome
                .errors
                .into_iter()
                .map(|row| BatchInviteErrorResponse {
                    email: row.email,
                    code: row.error.code().to_owned(),
                    error: row.error.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreviewResponse {
    pub email: String,
    pub role: Role,
    pub message: Option<String>,
    pub status: InviteStatus,
    pub expires_at: DateTime<Utc>,
    pub project: ProjectSummary,
    pub inviter: Option<InviterSummary>,
}

impl From<InvitePreview> for InvitePreviewResponse {
    fn from(preview: InvitePreview) -> Self {
        Self {
            status: preview.invite.effective_status(Utc::now()),
            email: preview.invite.email,
            role: preview.invite.role,
            message: preview.invite.message,
            expires_at: preview.invite.expires_at,
            project: preview.project,
            inviter: preview.inviter,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInviteResponse {
    pub project: ProjectResponse,
    pub member: MemberResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

impl From<AcceptedInvite> for AcceptInviteResponse {
    fn from(accepted: AcceptedInvite) -> Self {
        Self {
            warning: accepted.warning(),
            project: ProjectResponse::from(accepted.project),
            member: MemberResponse::from(accepted.member),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<GateError> for ErrorResponse {
    fn from(err: GateError) -> Self {
        Self {
            code: err.code().to_owned(),
            error: err.to_string(),
        }
    }
}
