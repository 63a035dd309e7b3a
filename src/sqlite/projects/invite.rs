use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{INVITE_COLUMNS, InviteRecord, MEMBER_COLUMNS, MemberRecord, SqliteProjectStore, invites_from};
use crate::GateError;
use crate::projects::{
    CreateInvite, Invite, InviteAcceptance, InviteRepository, InviteStatus, Member, Role,
};
use crate::sqlite::{db_error, is_foreign_key_violation, is_unique_violation};

impl SqliteProjectStore {
    async fn fetch_invite(&self, id: i64) -> Result<Option<Invite>, GateError> {
        let row: Option<InviteRecord> = sqlx::query_as(&format!(
            "SELECT {INVITE_COLUMNS} FROM project_invites WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_invite_by_id", e))?;

        row.map(Invite::try_from).transpose()
    }

    /// Re-reads the row after a guarded write touched nothing.
    async fn transition_failure(&self, id: i64, now: DateTime<Utc>) -> GateError {
        match self.fetch_invite(id).await {
            Ok(invite) => crate::projects::transition_error(invite.as_ref(), now),
            Err(err) => err,
        }
    }
}

#[async_trait]
impl InviteRepository for SqliteProjectStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, data), err))]
    async fn create(&self, data: CreateInvite, now: DateTime<Utc>) -> Result<Invite, GateError> {
        // one statement, so the duplicate check and the insert cannot interleave
        let row: Option<InviteRecord> = sqlx::query_as(&format!(
            r"
            INSERT INTO project_invites
                (project_id, email, role, message, inviter_user_id, token_hash, status, created_at, updated_at, expires_at)
            SELECT ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM project_invites
                WHERE project_id = ? AND email = ? AND status = 'pending' AND expires_at >= ?
            )
            RETURNING {INVITE_COLUMNS}
            "
        ))
        .bind(data.project_id)
        .bind(&data.email)
        .bind(data.role.as_str())
        .bind(&data.message)
        .bind(data.inviter_user_id)
        .bind(&data.token_hash)
        .bind(now)
        .bind(now)
        .bind(data.expires_at)
        .bind(data.project_id)
        .bind(&data.email)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                GateError::NotFound
            } else if is_unique_violation(&e) {
                GateError::Conflict
            } else {
                db_error("create_invite", e)
            }
        })?;

        row.ok_or(GateError::DuplicatePendingInvite)?.try_into()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Invite>, GateError> {
        self.fetch_invite(id).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, token_hash), err))]
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Invite>, GateError> {
        let row: Option<InviteRecord> = sqlx::query_as(&format!(
            "SELECT {INVITE_COLUMNS} FROM project_invites WHERE token_hash = ?"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_invite_by_token_hash", e))?;

        row.map(Invite::try_from).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_pending_by_project(
        &self,
        project_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invite>, GateError> {
        let rows: Vec<InviteRecord> = sqlx::query_as(&format!(
            r"
            SELECT {INVITE_COLUMNS} FROM project_invites
            WHERE project_id = ? AND status = 'pending' AND expires_at >= ?
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(project_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("find_pending_invites", e))?;

        invites_from(rows)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn transition(
        &self,
        id: i64,
        to: InviteStatus,
        now: DateTime<Utc>,
    ) -> Result<Invite, GateError> {
        let row: Option<InviteRecord> = sqlx::query_as(&format!(
            r"
            UPDATE project_invites SET status = ?, responded_at = ?, updated_at = ?
            WHERE id = ? AND status = 'pending' AND expires_at >= ?
            RETURNING {INVITE_COLUMNS}
            "
        ))
        .bind(to.as_str())
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("transition_invite", e))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.transition_failure(id, now).await),
        }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, token_hash), err))]
    async fn refresh(
        &self,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Invite, GateError> {
        let row: Option<InviteRecord> = sqlx::query_as(&format!(
            r"
            UPDATE project_invites SET token_hash = ?, expires_at = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            RETURNING {INVITE_COLUMNS}
            "
        ))
        .bind(token_hash)
        .bind(expires_at)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("refresh_invite", e))?;

        match row {
            Some(row) => row.try_into(),
            None => match self.fetch_invite(id).await? {
                Some(_) => Err(GateError::InvalidState),
                None => Err(GateError::NotFound),
            },
        }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn accept(
        &self,
        id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<InviteAcceptance, GateError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin_accept_invite", e))?;

        // serialization point for concurrent accepts
        let invite: Option<InviteRecord> = sqlx::query_as(&format!(
            r"
            UPDATE project_invites
            SET status = 'accepted', accepted_by = ?, responded_at = ?, updated_at = ?
            WHERE id = ? AND status = 'pending' AND expires_at >= ?
            RETURNING {INVITE_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("accept_invite", e))?;

        let Some(invite) = invite else {
            drop(tx);
            return Err(self.transition_failure(id, now).await);
        };
        let invite: Invite = invite.try_into()?;

        let existing: Option<MemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM project_members WHERE project_id = ? AND user_id = ?"
        ))
        .bind(invite.project_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("find_accepting_member", e))?;
        let existing = existing.map(Member::try_from).transpose()?;

        let (member, newly_joined) = match existing {
            Some(member) if invite.role != Role::Owner || member.role == Role::Owner => {
                (member, false)
            }
            existing => {
                if invite.role == Role::Owner {
                    // only the owner who issued it can still hand over ownership
                    let demoted = sqlx::query(
                        "UPDATE project_members SET role = 'admin', updated_at = ? WHERE project_id = ? AND role = 'owner' AND user_id = ?",
                    )
                    .bind(now)
                    .bind(invite.project_id)
                    .bind(invite.inviter_user_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| db_error("demote_owner_on_accept", e))?;

                    if demoted.rows_affected() != 1 {
                        return Err(GateError::Forbidden);
                    }
                }

                let row: MemberRecord = match &existing {
                    Some(member) => sqlx::query_as(&format!(
                        "UPDATE project_members SET role = ?, updated_at = ? WHERE id = ? RETURNING {MEMBER_COLUMNS}"
                    ))
                    .bind(invite.role.as_str())
                    .bind(now)
                    .bind(member.id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| db_error("promote_member_on_accept", e))?,
                    None => sqlx::query_as(&format!(
                        "INSERT INTO project_members (project_id, user_id, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?) RETURNING {MEMBER_COLUMNS}"
                    ))
                    .bind(invite.project_id)
                    .bind(user_id)
                    .bind(invite.role.as_str())
                    .bind(now)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| {
                        if is_foreign_key_violation(&e) {
                            GateError::NotFound
                        } else {
                            db_error("insert_member_on_accept", e)
                        }
                    })?,
                };
                (row.try_into()?, existing.is_none())
            }
        };

        tx.commit()
            .await
            .map_err(|e| db_error("commit_accept_invite", e))?;

        Ok(InviteAcceptance {
            invite,
            member,
            newly_joined,
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete_stale(&self, before: DateTime<Utc>) -> Result<u64, GateError> {
        let result = sqlx::query(
            r"
            DELETE FROM project_invites
            WHERE (status = 'pending' AND expires_at < ?)
               OR (status <> 'pending' AND updated_at < ?)
            ",
        )
        .bind(before)
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("delete_stale_invites", e))?;

        Ok(result.rows_affected())
    }
}
