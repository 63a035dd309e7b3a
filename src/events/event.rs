use chrono::{DateTime, Utc};

use crate::projects::Role;

/// Events emitted by the project services and the auth bridge.
#[derive(Debug, Clone)]
pub enum ProjectEvent {
    ProjectCreated {
        project_id: i64,
        owner_user_id: i64,
        at: DateTime<Utc>,
    },

    // invites
    InviteCreated {
        invite_id: i64,
        project_id: i64,
        email: String,
        role: Role,
        inviter_user_id: i64,
        at: DateTime<Utc>,
    },
    InviteResent {
        invite_id: i64,
        project_id: i64,
        email: String,
        at: DateTime<Utc>,
    },
    InviteCancelled {
        invite_id: i64,
        project_id: i64,
        cancelled_by: i64,
        at: DateTime<Utc>,
    },
    InviteDeclined {
        invite_id: i64,
        project_id: i64,
        at: DateTime<Utc>,
    },
    InviteAccepted {
        invite_id: i64,
        project_id: i64,
        user_id: i64,
        email_mismatch: bool,
        at: DateTime<Utc>,
    },

    // membership
    MemberRoleChanged {
        project_id: i64,
        member_id: i64,
        changed_by: i64,
        from: Role,
        to: Role,
        at: DateTime<Utc>,
    },
    OwnershipTransferred {
        project_id: i64,
        from_user_id: i64,
        to_user_id: i64,
        at: DateTime<Utc>,
    },
    MemberRemoved {
        project_id: i64,
        user_id: i64,
        removed_by: i64,
        at: DateTime<Utc>,
    },

    // auth
    UserRegistered {
        user_id: i64,
        email: String,
        at: DateTime<Utc>,
    },
    LoginSucceeded {
        user_id: i64,
        email: String,
        at: DateTime<Utc>,
    },
    AutoAcceptSkipped {
        user_id: i64,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl ProjectEvent {
    /// Dot-separated name for logs and traces.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProjectCreated { .. } => "project.created",
            Self::InviteCreated { .. } => "invite.created",
            Self::InviteResent { .. } => "invite.resent",
            Self::InviteCancelled { .. } => "invite.cancelled",
            Self::InviteDeclined { .. } => "invite.declined",
            Self::InviteAccepted { .. } => "invite.accepted",
            Self::MemberRoleChanged { .. } => "member.role_changed",
            Self::OwnershipTransferred { .. } => "member.ownership_transferred",
            Self::MemberRemoved { .. } => "member.removed",
            Self::UserRegistered { .. } => "auth.user_registered",
            Self::LoginSucceeded { .. } => "auth.login_succeeded",
            Self::AutoAcceptSkipped { .. } => "auth.auto_accept_skipped",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ProjectCreated { at, .. }
            | Self::InviteCreated { at, .. }
            | Self::InviteResent { at, .. }
            | Self::InviteCancelled { at, .. }
            | Self::InviteDeclined { at, .. }
            | Self::InviteAccepted { at, .. }
            | Self::MemberRoleChanged { at, .. }
            | Self::OwnershipTransferred { at, .. }
            | Self::MemberRemoved { at, .. }
            | Self::UserRegistered { at, .. }
            | Self::LoginSucceeded { at, .. }
            | Self::AutoAcceptSkipped { at, .. } => *at,
        }
    }

    /// Project the event concerns, if any.
    pub fn project_id(&self) -> Option<i64> {
        match self {
            Self::ProjectCreated { project_id, .. }
            | Self::InviteCreated { project_id, .. }
            | Self::InviteResent { project_id, .. }
            | Self::InviteCancelled { project_id, .. }
            | Self::InviteDeclined { project_id, .. }
            | Self::InviteAccepted { project_id, .. }
            | Self::MemberRoleChanged { project_id, .. }
            | Self::OwnershipTransferred { project_id, .. }
            | Self::MemberRemoved { project_id, .. } => Some(*project_id),
            Self::UserRegistered { .. }
            | Self::LoginSucceeded { .. }
            | Self::AutoAcceptSkipped { .. } => None,
        }
    }
}
