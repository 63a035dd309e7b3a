use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::db_error;
use crate::crypto::{generate_token_default, hash_token};
use crate::{AccessToken, GateError, SecretString, TokenRepository};

/// Bearer tokens, stored by SHA-256 digest.
#[derive(Clone)]
pub struct SqliteTokenRepository {
    pool: SqlitePool,
}

impl SqliteTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Deletes tokens past their deadline.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn prune_expired(&self) -> Result<u64, GateError> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("prune_expired_tokens", e))?;

        Ok(result.rows_affected())
    }
}

#[derive(FromRow)]
struct TokenRecord {
    user_id: i64,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TokenRecord {
    fn with_plain_token(self, plain_token: String) -> AccessToken {
        AccessToken {
            token: SecretString::new(plain_token),
            user_id: self.user_id,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create_token(
        &self,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessToken, GateError> {
        let plain_token = generate_token_default();

        let row: TokenRecord = sqlx::query_as(
            r"INSERT INTO access_tokens (token_hash, user_id, expires_at, created_at)
               VALUES (?, ?, ?, ?)
               RETURNING user_id, expires_at, created_at",
        )
        .bind(hash_token(&plain_token))
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create_token", e))?;

        Ok(row.with_plain_token(plain_token))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, token), err))]
    async fn find_token(&self, token: &str) -> Result<Option<AccessToken>, GateError> {
        let row: Option<TokenRecord> = sqlx::query_as(
            "SELECT user_id, expires_at, created_at FROM access_tokens WHERE token_hash = ?",
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_token", e))?;

        Ok(row.map(|r| r.with_plain_token(token.to_owned())))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, token), err))]
    async fn revoke_token(&self, token: &str) -> Result<(), GateError> {
        sqlx::query("DELETE FROM access_tokens WHERE token_hash = ?")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("revoke_token", e))?;

        Ok(())
    }
}
