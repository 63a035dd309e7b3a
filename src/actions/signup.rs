use chrono::Utc;

use crate::config::SessionConfig;
use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::events::{ProjectEvent, dispatch};
use crate::validators::{PasswordPolicy, normalize_email, validate_email, validate_name};
use crate::{AccessToken, AuthUser, GateError, SecretString, TokenRepository, UserRepository};

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub name: String,
    pub password: SecretString,
}

/// Registers a user and opens a session for them.
pub struct SignupAction<U: UserRepository, T: TokenRepository, H: PasswordHasher = Argon2Hasher> {
    user_repository: U,
    token_repository: T,
    hasher: H,
    password_policy: PasswordPolicy,
    session: SessionConfig,
}

impl<U: UserRepository, T: TokenRepository> SignupAction<U, T> {
    pub fn new(user_repository: U, token_repository: T) -> Self {
        Self::with_hasher(user_repository, token_repository, Argon2Hasher::default())
    }
}

impl<U: UserRepository, T: TokenRepository, H: PasswordHasher> SignupAction<U, T, H> {
    pub fn with_hasher(user_repository: U, token_repository: T, hasher: H) -> Self {
        Self {
            user_repository,
            token_repository,
            hasher,
            password_policy: PasswordPolicy::default(),
            session: SessionConfig::default(),
        }
    }

    #[must_use]
    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    #[must_use]
    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// # Returns
    ///
    /// - `Ok((user, token))` - account created, token holds the plain value
    /// - `Err(GateError::InvalidEmail)` / `Err(GateError::Validation(_))` - bad input
    /// - `Err(GateError::UserAlreadyExists)` - email taken
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "signup", skip_all, err))]
    pub async fn execute(&self, input: SignupInput) -> Result<(AuthUser, AccessToken), GateError> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        let name = input.name.trim();
        validate_name(name)?;
        self.password_policy
            .validate(input.password.expose_secret())?;

        if self.user_repository.find_user_by_email(&email).await?.is_some() {
            return Err(GateError::UserAlreadyExists);
        }

        let hashed = self.hasher.hash(input.password.expose_secret())?;
        let user = self
            .user_repository
            .create_user(&email, name, &hashed)
            .await?;

        let expires_at = Utc::now() + self.session.access_token_expiry;
        let token = self.token_repository.create_token(user.id, expires_at).await?;

        log::info!(target: "gatehouse", "msg=\"user registered\", user_id={}", user.id);

        dispatch(ProjectEvent::UserRegistered {
            user_id: user.id,
            email: user.email.clone(),
            at: Utc::now(),
        })
        .await;

        Ok((user, token))
    }
}
