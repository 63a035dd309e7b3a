//! `SQLite` implementation of the project, member and invite repositories.
//!
//! One type implements all three traits so that accept and ownership
//! transfer can span tables inside a single transaction.

mod invite;
mod member;
mod project;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::GateError;
use crate::projects::{Invite, Member, Project};

#[derive(Clone)]
pub struct SqliteProjectStore {
    pool: SqlitePool,
}

impl SqliteProjectStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(super) const PROJECT_COLUMNS: &str = "id, name, description, created_at, updated_at";
pub(super) const MEMBER_COLUMNS: &str = "id, project_id, user_id, role, created_at, updated_at";
pub(super) const INVITE_COLUMNS: &str = "id, project_id, email, role, message, inviter_user_id, token_hash, status, accepted_by, created_at, updated_at, expires_at, responded_at";

#[derive(FromRow)]
pub(super) struct ProjectRecord {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRecord> for Project {
    fn from(row: ProjectRecord) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
pub(super) struct MemberRecord {
    id: i64,
    project_id: i64,
    user_id: i64,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MemberRecord> for Member {
    type Error = GateError;

    fn try_from(row: MemberRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            user_id: row.user_id,
            role: row.role.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
pub(super) struct InviteRecord {
    id: i64,
    project_id: i64,
    email: String,
    role: String,
    message: Option<String>,
    inviter_user_id: i64,
    token_hash: String,
    status: String,
    accepted_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

impl TryFrom<InviteRecord> for Invite {
    type Error = GateError;

    fn try_from(row: InviteRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            email: row.email,
            role: row.role.parse()?,
            message: row.message,
            inviter_user_id: row.inviter_user_id,
            token_hash: row.token_hash,
            status: row.status.parse()?,
            accepted_by: row.accepted_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            expires_at: row.expires_at,
            responded_at: row.responded_at,
        })
    }
}

pub(super) fn members_from(rows: Vec<MemberRecord>) -> Result<Vec<Member>, GateError> {
    rows.into_iter().map(Member::try_from).collect()
}

pub(super) fn invites_from(rows: Vec<InviteRecord>) -> Result<Vec<Invite>, GateError> {
    rows.into_iter().map(Invite::try_from).collect()
}
