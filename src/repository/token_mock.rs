use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::token::{AccessToken, TokenRepository};
use crate::crypto::{generate_token_default, hash_token};
use crate::{GateError, SecretString};

#[derive(Clone, Default)]
pub struct MockTokenRepository {
    /// Stored rows keep the digest in `token`.
    pub tokens: Arc<Mutex<Vec<AccessToken>>>,
}

impl MockTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AccessToken>>, GateError> {
        self.tokens
            .lock()
            .map_err(|_| GateError::Internal("lock poisoned".into()))
    }
}

#[async_trait]
impl TokenRepository for MockTokenRepository {
    async fn create_token(
        &self,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessToken, GateError> {
        let plain_token = generate_token_default();
        let now = Utc::now();

        self.lock()?.push(AccessToken {
            token: SecretString::new(hash_token(&plain_token)),
            user_id,
            expires_at,
            created_at: now,
        });

        Ok(AccessToken {
            token: SecretString::new(plain_token),
            user_id,
            expires_at,
            created_at: now,
        })
    }

    async fn find_token(&self, token: &str) -> Result<Option<AccessToken>, GateError> {
        let hashed = hash_token(token);
        Ok(self
            .lock()?
            .iter()
            .find(|t| t.token.expose_secret() == hashed)
            .cloned())
    }

    async fn revoke_token(&self, token: &str) -> Result<(), GateError> {
        let hashed = hash_token(token);
        self.lock()?.retain(|t| t.token.expose_secret() != hashed);
        Ok(())
    }
}
