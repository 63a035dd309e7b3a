use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::invite_store::{InviteStore, IssuedInvite, NewInvite};
use super::policy;
use super::repository::{InviteRepository, MemberRepository, ProjectRepository};
use super::types::{Invite, InviteStatus, Member, Project, Role};
use crate::config::{EmailMismatchPolicy, InviteConfig};
use crate::events::{ProjectEvent, dispatch};
use crate::validators::normalize_email;
use crate::{GateError, SecretString, UserRepository};

/// Warning attached to an accept whose signed-in email differs from the invite's.
pub const EMAIL_MISMATCH_WARNING: &str =
    "signed in as a different account than the invite was sent to";

/// One row of a batch invite request.
#[derive(Debug, Clone, Deserialize)]
pub struct InviteRow {
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub message: Option<String>,
}

/// A row that could not be invited.
#[derive(Debug, Clone)]
pub struct BatchInviteError {
    pub email: String,
    pub error: GateError,
}

/// Batch result. Partial success is normal: failed rows never abort the rest.
#[derive(Debug, Clone, Default)]
pub struct BatchInviteOutcome {
    pub results: Vec<IssuedInvite>,
    pub errors: Vec<BatchInviteError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            description: project.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InviterSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// What an unauthenticated holder of the token may see.
#[derive(Debug, Clone)]
pub struct InvitePreview {
    pub invite: Invite,
    pub project: ProjectSummary,
    /// `None` when the inviter's account no longer exists.
    pub inviter: Option<InviterSummary>,
}

#[derive(Debug, Clone)]
pub struct AcceptedInvite {
    pub project: Project,
    pub member: Member,
    pub email_mismatch: bool,
    /// `false` when the user was already a member (idempotent join).
    pub newly_joined: bool,
}

impl AcceptedInvite {
    pub fn warning(&self) -> Option<&'static str> {
        self.email_mismatch.then_some(EMAIL_MISMATCH_WARNING)
    }
}

/// Invite workflows: batch issue, preview, accept, decline, cancel, resend.
pub struct InviteService<U, P, M, I>
where
    U: UserRepository,
    P: ProjectRepository,
    M: MemberRepository,
    I: InviteRepository,
{
    user_repo: U,
    project_repo: P,
    member_repo: M,
    invites: InviteStore<I>,
    config: InviteConfig,
}

impl<U, P, M, I> InviteService<U, P, M, I>
where
    U: UserRepository,
    P: ProjectRepository,
    M: MemberRepository,
    I: InviteRepository,
{
    pub fn new(user_repo: U, project_repo: P, member_repo: M, invite_repo: I) -> Self {
        Self::with_config(
            user_repo,
            project_repo,
            member_repo,
            invite_repo,
            InviteConfig::default(),
        )
    }

    pub fn with_config(
        user_repo: U,
        project_repo: P,
        member_repo: M,
        invite_repo: I,
        config: InviteConfig,
    ) -> Self {
        Self {
            user_repo,
            project_repo,
            member_repo,
            invites: InviteStore::new(invite_repo),
            config,
        }
    }

    pub fn store(&self) -> &InviteStore<I> {
        &self.invites
    }

    /// Issues one invite per row.
    ///
    /// The whole batch is rejected only when `actor` cannot manage invites
    /// for `project_id` (`Forbidden`) or the batch is too large
    /// (`Validation`). Row failures land in `errors`, in input order.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "create_batch", skip_all, err))]
    pub async fn create_batch(
        &self,
        project_id: i64,
        actor: &Member,
        rows: Vec<InviteRow>,
    ) -> Result<BatchInviteOutcome, GateError> {
        if actor.project_id != project_id || !policy::can_manage_invites(actor.role) {
            return Err(GateError::Forbidden);
        }
        if rows.len() > self.config.max_batch_size {
            return Err(GateError::Validation(format!(
                "A batch may contain at most {} invites",
                self.config.max_batch_size
            )));
        }

        let mut outcome = BatchInviteOutcome::default();
        for row in rows {
            let email = normalize_email(&row.email);
            match self.invite_row(project_id, actor, row).await {
                Ok(issued) => outcome.results.push(issued),
                Err(err @ (GateError::DatabaseError(_) | GateError::Internal(_))) => {
                    return Err(err);
                }
                Err(error) => {
                    log::info!(
                        target: "gatehouse",
                        "msg=\"invite row rejected\", project_id={project_id}, code={}",
                        error.code()
                    );
                    outcome.errors.push(BatchInviteError { email, error });
                }
            }
        }

        log::info!(
            target: "gatehouse",
            "msg=\"batch invite processed\", project_id={project_id}, created={}, failed={}",
            outcome.results.len(),
            outcome.errors.len()
        );

        Ok(outcome)
    }

    async fn invite_row(
        &self,
        project_id: i64,
        actor: &Member,
        row: InviteRow,
    ) -> Result<IssuedInvite, GateError> {
        if !policy::can_invite_as(actor.role, row.role) {
            return Err(GateError::Forbidden);
        }

        let email = normalize_email(&row.email);
        crate::validators::validate_email(&email)?;

        if let Some(user) = self.user_repo.find_user_by_email(&email).await? {
            if self
                .member_repo
                .find_by_project_and_user(project_id, user.id)
                .await?
                .is_some()
            {
                return Err(GateError::AlreadyMember);
            }
        }

        let issued = self
            .invites
            .create(
                NewInvite {
                    project_id,
                    email,
                    role: row.role,
                    inviter_user_id: actor.user_id,
                    message: row.message,
                },
                self.config.ttl,
            )
            .await?;

        dispatch(ProjectEvent::InviteCreated {
            invite_id: issued.invite.id,
            project_id,
            email: issued.invite.email.clone(),
            role: issued.invite.role,
            inviter_user_id: actor.user_id,
            at: Utc::now(),
        })
        .await;

        Ok(issued)
    }

    /// Invite metadata for the landing page. No authentication needed.
    pub async fn preview(&self, token: &SecretString) -> Result<InvitePreview, GateError> {
        let invite = self.invites.lookup_live(token).await?;
        let project = self.load_project(invite.project_id).await?;
        let inviter = self
            .user_repo
            .find_user_by_id(invite.inviter_user_id)
            .await?
            .map(|u| InviterSummary {
                id: u.id,
                name: u.name,
                email: u.email,
            });

        Ok(InvitePreview {
            invite,
            project: ProjectSummary::from(&project),
            inviter,
        })
    }

    /// Accepts the invite for an authenticated user.
    ///
    /// Accepting an invite the same user already consumed succeeds again
    /// without creating a second member.
    ///
    /// # Returns
    ///
    /// - `Ok(accepted)` - the user is a member of the invite's project
    /// - `Err(GateError::NotFound)` - unknown token
    /// - `Err(GateError::Expired)` - past its deadline
    /// - `Err(GateError::InvalidState)` - declined, cancelled, or used by someone else
    /// - `Err(GateError::EmailMismatch)` - only under `EmailMismatchPolicy::Reject`
    /// - `Err(GateError::Forbidden)` - an OWNER invite whose inviter no longer owns the project
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "accept_invite", skip_all, err))]
    pub async fn accept(
        &self,
        token: &SecretString,
        user_id: i64,
        email: &str,
    ) -> Result<AcceptedInvite, GateError> {
        let invite = self.invites.lookup(token).await?;
        let email_mismatch = normalize_email(email) != invite.email;

        match invite.effective_status(Utc::now()) {
            InviteStatus::Pending => {}
            InviteStatus::Accepted => return self.rejoin(&invite, user_id, email_mismatch).await,
            InviteStatus::Expired => return Err(GateError::Expired),
            InviteStatus::Declined | InviteStatus::Cancelled => {
                return Err(GateError::InvalidState);
            }
        }

        if email_mismatch {
            if self.config.email_mismatch == EmailMismatchPolicy::Reject {
                return Err(GateError::EmailMismatch);
            }
            log::warn!(
                target: "gatehouse",
                "msg=\"invite accepted by a different email\", invite_id={}, user_id={user_id}",
                invite.id
            );
        }

        let acceptance = match self.invites.mark_accepted(token, user_id).await {
            Ok(acceptance) => acceptance,
            // lost the race against a concurrent accept
            Err(GateError::InvalidState) => {
                return self.rejoin(&invite, user_id, email_mismatch).await;
            }
            Err(err) => return Err(err),
        };
        let project = self.load_project(invite.project_id).await?;

        log::info!(
            target: "gatehouse",
            "msg=\"invite accepted\", invite_id={}, project_id={}, user_id={user_id}, newly_joined={}",
            invite.id,
            project.id,
            acceptance.newly_joined
        );

        dispatch(ProjectEvent::InviteAccepted {
            invite_id: invite.id,
            project_id: project.id,
            user_id,
            email_mismatch,
            at: Utc::now(),
        })
        .await;

        Ok(AcceptedInvite {
            project,
            member: acceptance.member,
            email_mismatch,
            newly_joined: acceptance.newly_joined,
        })
    }

    /// Success for an already accepted invite when `user_id` is in the project.
    async fn rejoin(
        &self,
        invite: &Invite,
        user_id: i64,
        email_mismatch: bool,
    ) -> Result<AcceptedInvite, GateError> {
        let member = self
            .member_repo
            .find_by_project_and_user(invite.project_id, user_id)
            .await?
            .ok_or(GateError::InvalidState)?;
        let project = self.load_project(invite.project_id).await?;

        Ok(AcceptedInvite {
            project,
            member,
            email_mismatch,
            newly_joined: false,
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "decline_invite", skip_all, err))]
    pub async fn decline(&self, token: &SecretString) -> Result<Invite, GateError> {
        let invite = self.invites.mark_declined(token).await?;

        log::info!(
            target: "gatehouse",
            "msg=\"invite declined\", invite_id={}, project_id={}",
            invite.id,
            invite.project_id
        );

        dispatch(ProjectEvent::InviteDeclined {
            invite_id: invite.id,
            project_id: invite.project_id,
            at: Utc::now(),
        })
        .await;

        Ok(invite)
    }

    /// Cancels a pending invite. `actor_user_id` must manage the invite's project.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "cancel_invite", skip_all, err))]
    pub async fn cancel(&self, id: i64, actor_user_id: i64) -> Result<Invite, GateError> {
        let invite = self.invites.find(id).await?;
        self.ensure_manager(invite.project_id, actor_user_id).await?;

        let invite = self.invites.mark_cancelled(id).await?;

        log::info!(
            target: "gatehouse",
            "msg=\"invite cancelled\", invite_id={}, project_id={}, cancelled_by={actor_user_id}",
            invite.id,
            invite.project_id
        );

        dispatch(ProjectEvent::InviteCancelled {
            invite_id: invite.id,
            project_id: invite.project_id,
            cancelled_by: actor_user_id,
            at: Utc::now(),
        })
        .await;

        Ok(invite)
    }

    /// Re-issues a pending invite with a fresh token and deadline.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "resend_invite", skip_all, err))]
    pub async fn resend(&self, id: i64, actor_user_id: i64) -> Result<IssuedInvite, GateError> {
        let invite = self.invites.find(id).await?;
        self.ensure_manager(invite.project_id, actor_user_id).await?;

        let issued = self.invites.resend(id, self.config.ttl).await?;

        dispatch(ProjectEvent::InviteResent {
            invite_id: issued.invite.id,
            project_id: issued.invite.project_id,
            email: issued.invite.email.clone(),
            at: Utc::now(),
        })
        .await;

        Ok(issued)
    }

    pub async fn list_pending(
        &self,
        project_id: i64,
        actor: &Member,
    ) -> Result<Vec<Invite>, GateError> {
        if actor.project_id != project_id || !policy::can_manage_invites(actor.role) {
            return Err(GateError::Forbidden);
        }
        self.invites.list_pending(project_id).await
    }

    /// Deletes invites older than the configured retention.
    pub async fn purge_stale(&self) -> Result<u64, GateError> {
        self.invites.purge(self.config.purge_after).await
    }

    async fn ensure_manager(&self, project_id: i64, user_id: i64) -> Result<Member, GateError> {
        let actor = self
            .member_repo
            .find_by_project_and_user(project_id, user_id)
            .await?
            .ok_or(GateError::Forbidden)?;

        if !policy::can_manage_invites(actor.role) {
            return Err(GateError::Forbidden);
        }

        Ok(actor)
    }

    async fn load_project(&self, id: i64) -> Result<Project, GateError> {
        self.project_repo
            .find_by_id(id)
            .await?
            .ok_or(GateError::NotFound)
    }
}
