use chrono::Utc;

use crate::config::SessionConfig;
use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::events::{ProjectEvent, dispatch};
use crate::validators::normalize_email;
use crate::{AccessToken, AuthUser, GateError, SecretString, TokenRepository, UserRepository};

/// Verifies credentials and opens a session.
pub struct LoginAction<U: UserRepository, T: TokenRepository, H: PasswordHasher = Argon2Hasher> {
    user_repository: U,
    token_repository: T,
    hasher: H,
    session: SessionConfig,
}

impl<U: UserRepository, T: TokenRepository> LoginAction<U, T> {
    pub fn new(user_repository: U, token_repository: T) -> Self {
        Self::with_hasher(user_repository, token_repository, Argon2Hasher::default())
    }
}

impl<U: UserRepository, T: TokenRepository, H: PasswordHasher> LoginAction<U, T, H> {
    pub fn with_hasher(user_repository: U, token_repository: T, hasher: H) -> Self {
        Self {
            user_repository,
            token_repository,
            hasher,
            session: SessionConfig::default(),
        }
    }

    #[must_use]
    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Unknown email and wrong password both yield `GateError::InvalidCredentials`.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "login", skip_all, err))]
    pub async fn execute(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(AuthUser, AccessToken), GateError> {
        let email = normalize_email(email);
        let Some(user) = self.user_repository.find_user_by_email(&email).await? else {
            log::info!(target: "gatehouse", "msg=\"login failed\", reason=\"unknown email\"");
            return Err(GateError::InvalidCredentials);
        };

        if !self
            .hasher
            .verify(password.expose_secret(), &user.hashed_password)?
        {
            log::info!(
                target: "gatehouse",
                "msg=\"login failed\", reason=\"wrong password\", user_id={}",
                user.id
            );
            return Err(GateError::InvalidCredentials);
        }

        let expires_at = Utc::now() + self.session.access_token_expiry;
        let token = self.token_repository.create_token(user.id, expires_at).await?;

        dispatch(ProjectEvent::LoginSucceeded {
            user_id: user.id,
            email: user.email.clone(),
            at: Utc::now(),
        })
        .await;

        Ok((user, token))
    }
}
