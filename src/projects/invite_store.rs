use chrono::{Duration, Utc};

use super::repository::{CreateInvite, InviteAcceptance, InviteRepository};
use super::types::{Invite, InviteStatus, Role};
use crate::crypto::{generate_token_default, hash_token};
use crate::validators::{normalize_email, validate_email, validate_invite_message};
use crate::{GateError, SecretString};

/// Input for [`InviteStore::create`].
#[derive(Debug, Clone)]
pub struct NewInvite {
    pub project_id: i64,
    pub email: String,
    pub role: Role,
    pub inviter_user_id: i64,
    pub message: Option<String>,
}

/// An invite together with its plain token.
///
/// The token is only available here, right after creation or resend. The
/// store keeps its hash.
#[derive(Debug, Clone)]
pub struct IssuedInvite {
    pub invite: Invite,
    pub token: SecretString,
}

/// Invite lifecycle on top of an [`InviteRepository`].
///
/// Expiry is evaluated lazily: nothing rewrites rows when a deadline passes,
/// every read and transition compares `expires_at` with the current time.
pub struct InviteStore<I: InviteRepository> {
    invite_repo: I,
}

impl<I: InviteRepository> InviteStore<I> {
    pub fn new(invite_repo: I) -> Self {
        Self { invite_repo }
    }

    /// Issues a pending invite valid for `ttl`.
    ///
    /// # Returns
    ///
    /// - `Ok(issued)` - invite plus its plain token
    /// - `Err(GateError::InvalidEmail)` - email failed validation
    /// - `Err(GateError::DuplicatePendingInvite)` - a live invite for this email exists
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "invite_store.create", skip_all, err))]
    pub async fn create(&self, input: NewInvite, ttl: Duration) -> Result<IssuedInvite, GateError> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;

        let message = input
            .message
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty());
        if let Some(message) = &message {
            validate_invite_message(message)?;
        }

        let token = generate_token_default();
        let now = Utc::now();
        let invite = self
            .invite_repo
            .create(
                CreateInvite {
                    project_id: input.project_id,
                    email,
                    role: input.role,
                    message,
                    inviter_user_id: input.inviter_user_id,
                    token_hash: hash_token(&token),
                    expires_at: now + ttl,
                },
                now,
            )
            .await?;

        log::info!(
            target: "gatehouse",
            "msg=\"invite created\", invite_id={}, project_id={}, role={}",
            invite.id,
            invite.project_id,
            invite.role
        );

        Ok(IssuedInvite {
            invite,
            token: SecretString::new(token),
        })
    }

    /// Finds an invite by plain token, whatever its status.
    pub async fn lookup(&self, token: &SecretString) -> Result<Invite, GateError> {
        if token.is_empty() {
            return Err(GateError::NotFound);
        }

        self.invite_repo
            .find_by_token_hash(&hash_token(token.expose_secret()))
            .await?
            .ok_or(GateError::NotFound)
    }

    /// Like [`lookup`](Self::lookup), but a pending invite past its deadline
    /// is reported as `GateError::Expired`.
    pub async fn lookup_live(&self, token: &SecretString) -> Result<Invite, GateError> {
        let invite = self.lookup(token).await?;
        if invite.effective_status(Utc::now()) == InviteStatus::Expired {
            return Err(GateError::Expired);
        }
        Ok(invite)
    }

    pub async fn find(&self, id: i64) -> Result<Invite, GateError> {
        self.invite_repo
            .find_by_id(id)
            .await?
            .ok_or(GateError::NotFound)
    }

    /// Atomically accepts the invite and adds `user_id` to its project.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "invite_store.mark_accepted", skip_all, err))]
    pub async fn mark_accepted(
        &self,
        token: &SecretString,
        user_id: i64,
    ) -> Result<InviteAcceptance, GateError> {
        let invite = self.lookup(token).await?;
        self.invite_repo.accept(invite.id, user_id, Utc::now()).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "invite_store.mark_declined", skip_all, err))]
    pub async fn mark_declined(&self, token: &SecretString) -> Result<Invite, GateError> {
        let invite = self.lookup(token).await?;
        self.invite_repo
            .transition(invite.id, InviteStatus::Declined, Utc::now())
            .await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "invite_store.mark_cancelled", skip_all, err))]
    pub async fn mark_cancelled(&self, id: i64) -> Result<Invite, GateError> {
        self.invite_repo
            .transition(id, InviteStatus::Cancelled, Utc::now())
            .await
    }

    /// Extends a pending invite by `ttl` from now and rotates its token.
    ///
    /// Expired pending invites may be resent. The previous token stops
    /// working immediately.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "invite_store.resend", skip_all, err))]
    pub async fn resend(&self, id: i64, ttl: Duration) -> Result<IssuedInvite, GateError> {
        let token = generate_token_default();
        let now = Utc::now();
        let invite = self
            .invite_repo
            .refresh(id, &hash_token(&token), now + ttl, now)
            .await?;

        log::info!(
            target: "gatehouse",
            "msg=\"invite resent\", invite_id={}, project_id={}",
            invite.id,
            invite.project_id
        );

        Ok(IssuedInvite {
            invite,
            token: SecretString::new(token),
        })
    }

    pub async fn list_pending(&self, project_id: i64) -> Result<Vec<Invite>, GateError> {
        self.invite_repo
            .find_pending_by_project(project_id, Utc::now())
            .await
    }

    /// Deletes answered invites and expired pending invites older than `retention`.
    pub async fn purge(&self, retention: Duration) -> Result<u64, GateError> {
        let purged = self.invite_repo.delete_stale(Utc::now() - retention).await?;

        if purged > 0 {
            log::info!(target: "gatehouse", "msg=\"stale invites purged\", count={purged}");
        }

        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::mocks::MockProjectStore;
    use crate::projects::repository::{CreateProject, ProjectRepository};

    async fn setup() -> (MockProjectStore, InviteStore<MockProjectStore>, i64) {
        let store = MockProjectStore::new();
        let (project, _) = ProjectRepository::create(
            &store,
            CreateProject {
                name: "Apollo".to_owned(),
                description: None,
                owner_user_id: 1,
            },
        )
        .await
        .unwrap();
        (store.clone(), InviteStore::new(store), project.id)
    }

    fn new_invite(project_id: i64, email: &str) -> NewInvite {
        NewInvite {
            project_id,
            email: email.to_owned(),
            role: Role::Member,
            inviter_user_id: 1,
            message: Some("  welcome aboard ".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_hashes() {
        let (_, invites, project_id) = setup().await;

        let issued = invites
            .create(new_invite(project_id, "  Bob@X.com "), Duration::days(7))
            .await
            .unwrap();

        assert_eq!(issued.invite.email, "bob@x.com");
        assert_eq!(issued.invite.message.as_deref(), Some("welcome aboard"));
        assert_eq!(issued.invite.status, InviteStatus::Pending);
        assert_eq!(issued.token.expose_secret().len(), 32);
        assert_ne!(issued.invite.token_hash, issued.token.expose_secret());

        let found = invites.lookup(&issued.token).await.unwrap();
        assert_eq!(found.id, issued.invite.id);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_email() {
        let (_, invites, project_id) = setup().await;

        let err = invites
            .create(new_invite(project_id, "not-an-email"), Duration::days(7))
            .await
            .unwrap_err();
        assert_eq!(err, GateError::InvalidEmail);
    }

    #[tokio::test]
    async fn test_lookup_unknown_token() {
        let (_, invites, _) = setup().await;

        let err = invites.lookup(&SecretString::new("nope")).await.unwrap_err();
        assert_eq!(err, GateError::NotFound);
        let err = invites.lookup(&SecretString::new(" ")).await.unwrap_err();
        assert_eq!(err, GateError::NotFound);
    }

    #[tokio::test]
    async fn test_expiry_is_lazy_and_monotonic() {
        let (store, invites, project_id) = setup().await;
        let issued = invites
            .create(new_invite(project_id, "bob@x.com"), Duration::days(7))
            .await
            .unwrap();
        store
            .set_invite_expiry(issued.invite.id, Utc::now() - Duration::seconds(1))
            .unwrap();

        // plain lookup still returns the row, persisted status untouched
        let raw = invites.lookup(&issued.token).await.unwrap();
        assert_eq!(raw.status, InviteStatus::Pending);

        for _ in 0..2 {
            assert_eq!(
                invites.lookup_live(&issued.token).await.unwrap_err(),
                GateError::Expired
            );
            assert_eq!(
                invites.mark_declined(&issued.token).await.unwrap_err(),
                GateError::Expired
            );
            assert_eq!(
                invites.mark_accepted(&issued.token, 2).await.unwrap_err(),
                GateError::Expired
            );
        }
    }

    #[tokio::test]
    async fn test_cancel_then_decline_is_invalid_state() {
        let (_, invites, project_id) = setup().await;
        let issued = invites
            .create(new_invite(project_id, "bob@x.com"), Duration::days(7))
            .await
            .unwrap();

        let cancelled = invites.mark_cancelled(issued.invite.id).await.unwrap();
        assert_eq!(cancelled.status, InviteStatus::Cancelled);

        assert_eq!(
            invites.mark_declined(&issued.token).await.unwrap_err(),
            GateError::InvalidState
        );
    }

    #[tokio::test]
    async fn test_resend_rotates_token_and_revives_expired() {
        let (store, invites, project_id) = setup().await;
        let issued = invites
            .create(new_invite(project_id, "bob@x.com"), Duration::days(7))
            .await
            .unwrap();
        store
            .set_invite_expiry(issued.invite.id, Utc::now() - Duration::days(1))
            .unwrap();

        let resent = invites
            .resend(issued.invite.id, Duration::days(7))
            .await
            .unwrap();

        assert_ne!(resent.token, issued.token);
        assert!(resent.invite.expires_at > Utc::now());
        assert_eq!(
            invites.lookup(&issued.token).await.unwrap_err(),
            GateError::NotFound
        );
        assert_eq!(
            invites.lookup_live(&resent.token).await.unwrap().id,
            issued.invite.id
        );
    }

    #[tokio::test]
    async fn test_resend_requires_pending() {
        let (_, invites, project_id) = setup().await;
        let issued = invites
            .create(new_invite(project_id, "bob@x.com"), Duration::days(7))
            .await
            .unwrap();
        invites.mark_declined(&issued.token).await.unwrap();

        assert_eq!(
            invites
                .resend(issued.invite.id, Duration::days(7))
                .await
                .unwrap_err(),
            GateError::InvalidState
        );
        assert_eq!(
            invites.resend(999, Duration::days(7)).await.unwrap_err(),
            GateError::NotFound
        );
    }

    #[tokio::test]
    async fn test_list_pending_newest_first() {
        let (_, invites, project_id) = setup().await;
        let first = invites
            .create(new_invite(project_id, "a@x.com"), Duration::days(7))
            .await
            .unwrap();
        let second = invites
            .create(new_invite(project_id, "b@x.com"), Duration::days(7))
            .await
            .unwrap();
        invites
            .create(new_invite(project_id, "c@x.com"), Duration::days(7))
            .await
            .unwrap();
        invites.mark_cancelled(first.invite.id).await.unwrap();

        let pending = invites.list_pending(project_id).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|i| i.id != first.invite.id));
        assert_eq!(pending[1].id, second.invite.id);
    }
}
