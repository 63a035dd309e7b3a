use async_trait::async_trait;
use chrono::Utc;

use super::{MEMBER_COLUMNS, MemberRecord, SqliteProjectStore, members_from};
use crate::GateError;
use crate::projects::{CreateMember, Member, MemberRepository, Role};
use crate::sqlite::{db_error, is_foreign_key_violation, is_unique_violation};

#[async_trait]
impl MemberRepository for SqliteProjectStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, data), err))]
    async fn create(&self, data: CreateMember) -> Result<Member, GateError> {
        let now = Utc::now();
        let row: MemberRecord = sqlx::query_as(&format!(
            "INSERT INTO project_members (project_id, user_id, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?) RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                // (project_id, user_id) or the single-owner index
                if data.role == Role::Owner {
                    GateError::Conflict
                } else {
                    GateError::AlreadyMember
                }
            } else if is_foreign_key_violation(&e) {
                GateError::NotFound
            } else {
                db_error("create_member", e)
            }
        })?;

        row.try_into()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Member>, GateError> {
        let row: Option<MemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM project_members WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_member_by_id", e))?;

        row.map(Member::try_from).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_project_and_user(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Member>, GateError> {
        let row: Option<MemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM project_members WHERE project_id = ? AND user_id = ?"
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_member_by_project_and_user", e))?;

        row.map(Member::try_from).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_project(&self, project_id: i64) -> Result<Vec<Member>, GateError> {
        let rows: Vec<MemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM project_members WHERE project_id = ? ORDER BY id"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("find_members_by_project", e))?;

        members_from(rows)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn update_role(&self, id: i64, expected: Role, role: Role) -> Result<Member, GateError> {
        let row: Option<MemberRecord> = sqlx::query_as(&format!(
            "UPDATE project_members SET role = ?, updated_at = ? WHERE id = ? AND role = ? RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(role.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GateError::Conflict
            } else {
                db_error("update_member_role", e)
            }
        })?;

        row.ok_or(GateError::Conflict)?.try_into()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete(&self, id: i64, expected: Role) -> Result<(), GateError> {
        let result = sqlx::query("DELETE FROM project_members WHERE id = ? AND role = ?")
            .bind(id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete_member", e))?;

        if result.rows_affected() == 0 {
            return Err(GateError::Conflict);
        }

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn transfer_ownership(
        &self,
        from_id: i64,
        to_id: i64,
        to_expected: Role,
    ) -> Result<(Member, Member), GateError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin_transfer_ownership", e))?;

        // demote first, the single-owner index rejects two owners at any point
        let previous: Option<MemberRecord> = sqlx::query_as(&format!(
            "UPDATE project_members SET role = 'admin', updated_at = ? WHERE id = ? AND role = 'owner' RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(now)
        .bind(from_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("demote_owner", e))?;
        let previous: Member = previous.ok_or(GateError::Conflict)?.try_into()?;

        let owner: Option<MemberRecord> = sqlx::query_as(&format!(
            "UPDATE project_members SET role = 'owner', updated_at = ? WHERE id = ? AND role = ? AND project_id = ? RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(now)
        .bind(to_id)
        .bind(to_expected.as_str())
        .bind(previous.project_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GateError::Conflict
            } else {
                db_error("promote_owner", e)
            }
        })?;
        // dropping `tx` without commit rolls the demotion back
        let owner: Member = owner.ok_or(GateError::Conflict)?.try_into()?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit_transfer_ownership", e))?;

        Ok((owner, previous))
    }
}
