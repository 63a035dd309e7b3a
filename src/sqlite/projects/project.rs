use async_trait::async_trait;
use chrono::Utc;

use super::{MEMBER_COLUMNS, MemberRecord, PROJECT_COLUMNS, ProjectRecord, SqliteProjectStore};
use crate::GateError;
use crate::projects::{CreateProject, Member, Project, ProjectRepository, Role};
use crate::sqlite::db_error;

#[async_trait]
impl ProjectRepository for SqliteProjectStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, data), err))]
    async fn create(&self, data: CreateProject) -> Result<(Project, Member), GateError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin_create_project", e))?;

        let project: ProjectRecord = sqlx::query_as(&format!(
            "INSERT INTO projects (name, description, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(&data.name)
        .bind(&data.description)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("create_project", e))?;

        let owner: MemberRecord = sqlx::query_as(&format!(
            "INSERT INTO project_members (project_id, user_id, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?) RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(project.id)
        .bind(data.owner_user_id)
        .bind(Role::Owner.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("create_project_owner", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit_create_project", e))?;

        Ok((project.into(), owner.try_into()?))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Project>, GateError> {
        let row: Option<ProjectRecord> =
            sqlx::query_as(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find_project_by_id", e))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete(&self, id: i64) -> Result<(), GateError> {
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete_project", e))?;

        Ok(())
    }
}
