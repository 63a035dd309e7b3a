//! Auto-accept of an invite token during signup and login.
//!
//! Authentication always wins: once the user is signed in, any failure to
//! join the invited project is logged and reported as "no project", never as
//! an auth error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::actions::{LoginAction, SignupAction, SignupInput};
use crate::crypto::PasswordHasher;
use crate::events::{ProjectEvent, dispatch};
use crate::projects::{
    AcceptedInvite, InviteRepository, InviteService, MemberRepository, Project, ProjectRepository,
};
use crate::{AccessToken, AuthUser, GateError, SecretString, TokenRepository, UserRepository};

/// Anything that can accept an invite on behalf of an authenticated user.
#[async_trait]
pub trait InviteAcceptor: Send + Sync {
    async fn accept(
        &self,
        token: &SecretString,
        user_id: i64,
        email: &str,
    ) -> Result<AcceptedInvite, GateError>;
}

#[async_trait]
impl<U, P, M, I> InviteAcceptor for InviteService<U, P, M, I>
where
    U: UserRepository,
    P: ProjectRepository,
    M: MemberRepository,
    I: InviteRepository,
{
    async fn accept(
        &self,
        token: &SecretString,
        user_id: i64,
        email: &str,
    ) -> Result<AcceptedInvite, GateError> {
        InviteService::accept(self, token, user_id, email).await
    }
}

#[async_trait]
impl<A: InviteAcceptor + ?Sized> InviteAcceptor for Arc<A> {
    async fn accept(
        &self,
        token: &SecretString,
        user_id: i64,
        email: &str,
    ) -> Result<AcceptedInvite, GateError> {
        (**self).accept(token, user_id, email).await
    }
}

/// Result of a signup or login, with the project joined through the invite.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: AuthUser,
    pub token: AccessToken,
    pub auto_accepted_project: Option<Project>,
    /// Set when the project was joined with a different email than invited.
    pub email_mismatch: bool,
}

/// Signup and login that also try to accept an invite token.
pub struct AuthBridge<U, T, A, H = crate::crypto::Argon2Hasher>
where
    U: UserRepository,
    T: TokenRepository,
    A: InviteAcceptor,
    H: PasswordHasher,
{
    signup: SignupAction<U, T, H>,
    login: LoginAction<U, T, H>,
    acceptor: A,
}

impl<U, T, A, H> AuthBridge<U, T, A, H>
where
    U: UserRepository,
    T: TokenRepository,
    A: InviteAcceptor,
    H: PasswordHasher,
{
    pub fn new(signup: SignupAction<U, T, H>, login: LoginAction<U, T, H>, acceptor: A) -> Self {
        Self {
            signup,
            login,
            acceptor,
        }
    }

    /// Registers the user, then accepts `invite_token` if one was given.
    ///
    /// Fails only when signup itself fails.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "bridge_signup", skip_all, err))]
    pub async fn signup(
        &self,
        input: SignupInput,
        invite_token: Option<&SecretString>,
    ) -> Result<AuthOutcome, GateError> {
        let (user, token) = self.signup.execute(input).await?;
        Ok(self.finish(user, token, invite_token).await)
    }

    /// Logs the user in, then accepts `invite_token` if one was given.
    ///
    /// Fails only when login itself fails.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "bridge_login", skip_all, err))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        invite_token: Option<&SecretString>,
    ) -> Result<AuthOutcome, GateError> {
        let (user, token) = self.login.execute(email, password).await?;
        Ok(self.finish(user, token, invite_token).await)
    }

    async fn finish(
        &self,
        user: AuthUser,
        token: AccessToken,
        invite_token: Option<&SecretString>,
    ) -> AuthOutcome {
        let accepted = match invite_token.filter(|t| !t.is_empty()) {
            Some(invite_token) => self.try_accept(&user, invite_token).await,
            None => None,
        };

        let email_mismatch = accepted.as_ref().is_some_and(|a| a.email_mismatch);
        AuthOutcome {
            user,
            token,
            auto_accepted_project: accepted.map(|a| a.project),
            email_mismatch,
        }
    }

    async fn try_accept(&self, user: &AuthUser, invite_token: &SecretString) -> Option<AcceptedInvite> {
        match self.acceptor.accept(invite_token, user.id, &user.email).await {
            Ok(accepted) => {
                log::info!(
                    target: "gatehouse",
                    "msg=\"invite auto-accepted\", user_id={}, project_id={}",
                    user.id,
                    accepted.project.id
                );
                Some(accepted)
            }
            Err(err) => {
                log::warn!(
                    target: "gatehouse",
                    "msg=\"invite auto-accept skipped\", user_id={}, code={}",
                    user.id,
                    err.code()
                );
                dispatch(ProjectEvent::AutoAcceptSkipped {
                    user_id: user.id,
                    reason: err.code().to_owned(),
                    at: Utc::now(),
                })
                .await;
                None
            }
        }
    }
}
