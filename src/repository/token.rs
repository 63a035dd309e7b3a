use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{GateError, SecretString};

/// Opaque bearer token. Only the SHA-256 digest is stored, so `token` holds
/// the plain value only on the instance returned by `create_token`.
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub token: SecretString,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn create_token(
        &self,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessToken, GateError>;
    /// Looks a plain token up by its digest.
    async fn find_token(&self, token: &str) -> Result<Option<AccessToken>, GateError>;
    async fn revoke_token(&self, token: &str) -> Result<(), GateError>;
}
