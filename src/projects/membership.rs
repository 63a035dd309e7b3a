use chrono::Utc;

use super::policy;
use super::repository::{CreateMember, MemberRepository};
use super::types::{Member, Role};
use crate::GateError;
use crate::events::{ProjectEvent, dispatch};

/// Member rows of a project, mutated only after the role policy agrees.
///
/// Callers pass member snapshots they loaded earlier. Every write is
/// conditional on the target's role in that snapshot, so a concurrent change
/// surfaces as `GateError::Conflict` instead of being overwritten.
pub struct MembershipService<M: MemberRepository> {
    member_repo: M,
}

impl<M: MemberRepository> MembershipService<M> {
    pub fn new(member_repo: M) -> Self {
        Self { member_repo }
    }

    /// Adds a user with `role`. Ownership is never granted this way.
    ///
    /// # Returns
    ///
    /// - `Ok(member)` - the new row
    /// - `Err(GateError::AlreadyMember)` - the user already holds a role
    /// - `Err(GateError::Forbidden)` - `role` is OWNER
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "add_member", skip_all, err))]
    pub async fn add_member(
        &self,
        project_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<Member, GateError> {
        if role == Role::Owner {
            return Err(GateError::Forbidden);
        }

        let member = self
            .member_repo
            .create(CreateMember {
                project_id,
                user_id,
                role,
            })
            .await?;

        log::info!(
            target: "gatehouse",
            "msg=\"member added\", project_id={project_id}, user_id={user_id}, role={role}"
        );

        Ok(member)
    }

    /// The caller's own member row. Non-members get `Forbidden`.
    pub async fn find_actor(&self, project_id: i64, user_id: i64) -> Result<Member, GateError> {
        self.member_repo
            .find_by_project_and_user(project_id, user_id)
            .await?
            .ok_or(GateError::Forbidden)
    }

    pub async fn get_member(&self, id: i64) -> Result<Member, GateError> {
        self.member_repo
            .find_by_id(id)
            .await?
            .ok_or(GateError::NotFound)
    }

    /// Members of `project_id`, visible to members only.
    pub async fn list_members(
        &self,
        actor: &Member,
        project_id: i64,
    ) -> Result<Vec<Member>, GateError> {
        if actor.project_id != project_id {
            return Err(GateError::Forbidden);
        }
        self.member_repo.find_by_project(project_id).await
    }

    /// Sets `target`'s role to `new_role`.
    ///
    /// Granting OWNER to a non-owner is an ownership transfer: only the
    /// owner may do it, and the owner becomes ADMIN in the same write.
    ///
    /// # Returns
    ///
    /// - `Ok(member)` - the target row after the change
    /// - `Err(GateError::Forbidden)` - policy rejected the change
    /// - `Err(GateError::LastOwner)` - the owner tried to demote itself
    /// - `Err(GateError::Conflict)` - a role changed since the snapshot
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "change_role", skip_all, err))]
    pub async fn change_role(
        &self,
        actor: &Member,
        target: &Member,
        new_role: Role,
    ) -> Result<Member, GateError> {
        if actor.project_id != target.project_id {
            return Err(GateError::Forbidden);
        }

        if new_role == Role::Owner && target.role != Role::Owner {
            return self.transfer_ownership(actor, target).await;
        }

        let actor_is_target = actor.id == target.id;
        if !policy::can_change_role(actor.role, target.role, actor_is_target) {
            return Err(GateError::Forbidden);
        }
        if new_role == target.role {
            return Ok(target.clone());
        }
        if target.role == Role::Owner {
            return Err(GateError::LastOwner);
        }
        if !policy::available_target_roles(actor.role, target.role).contains(&new_role) {
            return Err(GateError::Forbidden);
        }

        let member = self
            .member_repo
            .update_role(target.id, target.role, new_role)
            .await?;

        log::info!(
            target: "gatehouse",
            "msg=\"member role changed\", project_id={}, member_id={}, from={}, to={}",
            member.project_id,
            member.id,
            target.role,
            new_role
        );

        dispatch(ProjectEvent::MemberRoleChanged {
            project_id: member.project_id,
            member_id: member.id,
            changed_by: actor.user_id,
            from: target.role,
            to: new_role,
            at: Utc::now(),
        })
        .await;

        Ok(member)
    }

    async fn transfer_ownership(&self, actor: &Member, target: &Member) -> Result<Member, GateError> {
        if actor.role != Role::Owner {
            return Err(GateError::Forbidden);
        }

        let (owner, previous) = self
            .member_repo
            .transfer_ownership(actor.id, target.id, target.role)
            .await?;

        log::info!(
            target: "gatehouse",
            "msg=\"ownership transferred\", project_id={}, from_user_id={}, to_user_id={}",
            owner.project_id,
            previous.user_id,
            owner.user_id
        );

        dispatch(ProjectEvent::OwnershipTransferred {
            project_id: owner.project_id,
            from_user_id: previous.user_id,
            to_user_id: owner.user_id,
            at: Utc::now(),
        })
        .await;

        Ok(owner)
    }

    /// Removes `target` from the project, or lets a member leave.
    ///
    /// # Returns
    ///
    /// - `Err(GateError::LastOwner)` - the owner tried to leave
    /// - `Err(GateError::Forbidden)` - policy rejected the removal
    /// - `Err(GateError::Conflict)` - the row changed or vanished since the snapshot
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "remove_member", skip_all, err))]
    pub async fn remove_member(&self, actor: &Member, target: &Member) -> Result<(), GateError> {
        if actor.project_id != target.project_id {
            return Err(GateError::Forbidden);
        }

        let actor_is_target = actor.id == target.id;
        if target.role == Role::Owner && actor_is_target {
            return Err(GateError::LastOwner);
        }
        if !policy::can_remove(actor.role, target.role, actor_is_target) {
            return Err(GateError::Forbidden);
        }

        self.member_repo.delete(target.id, target.role).await?;

        log::info!(
            target: "gatehouse",
            "msg=\"member removed\", project_id={}, user_id={}, removed_by={}",
            target.project_id,
            target.user_id,
            actor.user_id
        );

        dispatch(ProjectEvent::MemberRemoved {
            project_id: target.project_id,
            user_id: target.user_id,
            removed_by: actor.user_id,
            at: Utc::now(),
        })
        .await;

        Ok(())
    }
}
