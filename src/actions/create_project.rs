use chrono::Utc;

use crate::GateError;
use crate::events::{ProjectEvent, dispatch};
use crate::projects::{CreateProject, Member, Project, ProjectRepository};
use crate::validators::validate_name;

#[derive(Debug, Clone)]
pub struct CreateProjectInput {
    pub name: String,
    pub description: Option<String>,
}

/// Creates a project owned by the calling user.
///
/// The owner member row is written together with the project, so a project
/// never exists without its owner.
pub struct CreateProjectAction<P: ProjectRepository> {
    project_repo: P,
}

impl<P: ProjectRepository> CreateProjectAction<P> {
    pub fn new(project_repo: P) -> Self {
        Self { project_repo }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "create_project", skip_all, err))]
    pub async fn execute(
        &self,
        input: CreateProjectInput,
        owner_user_id: i64,
    ) -> Result<(Project, Member), GateError> {
        let name = input.name.trim().to_owned();
        validate_name(&name)?;
        let description = input
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let (project, owner) = self
            .project_repo
            .create(CreateProject {
                name,
                description,
                owner_user_id,
            })
            .await?;

        log::info!(
            target: "gatehouse",
            "msg=\"project created\", project_id={}, owner_user_id={owner_user_id}",
            project.id
        );

        dispatch(ProjectEvent::ProjectCreated {
            project_id: project.id,
            owner_user_id,
            at: Utc::now(),
        })
        .await;

        Ok((project, owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::{MockProjectStore, Role};

    #[tokio::test]
    async fn test_create_project_with_owner() {
        let action = CreateProjectAction::new(MockProjectStore::new());
        let (project, owner) = action
            .execute(
                CreateProjectInput {
                    name: "  Apollo ".to_owned(),
                    description: Some(" ".to_owned()),
                },
                7,
            )
            .await
            .unwrap();

        assert_eq!(project.name, "Apollo");
        assert_eq!(project.description, None);
        assert_eq!(owner.user_id, 7);
        assert_eq!(owner.role, Role::Owner);
    }

    #[tokio::test]
    async fn test_create_project_requires_name() {
        let action = CreateProjectAction::new(MockProjectStore::new());
        let err = action
            .execute(
                CreateProjectInput {
                    name: "   ".to_owned(),
                    description: None,
                },
                7,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Validation(_)));
    }
}
