use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::error::AppError;
use super::routes::AppState;
use crate::{AuthUser, GateError, TokenRepository, UserRepository};

/// validates bearer token from `Authorization` header and retrieves user
#[derive(Debug, Clone)]
pub struct AuthenticatedUser<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    user: AuthUser,
    _marker: PhantomData<(U, T)>,
}

impl<U, T> AuthenticatedUser<U, T>
where
    U: UserRepository,
    T: TokenRepository,
{
    pub fn into_inner(self) -> AuthUser {
        self.user
    }

    pub fn user(&self) -> &AuthUser {
        &self.user
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
}

impl<U, T, S> FromRequestParts<AppState<U, T, S>> for AuthenticatedUser<U, T>
where
    U: UserRepository + Clone + Send + Sync + 'static,
    T: TokenRepository + Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<U, T, S>,
    ) -> Result<Self, Self::Rejection> {
        let token =
            extract_bearer_token(&parts.headers).ok_or(AppError(GateError::TokenInvalid))?;

        let access_token = state
            .token_repo
            .find_token(&token)
            .await?
            .ok_or(AppError(GateError::TokenInvalid))?;

        if access_token.is_expired() {
            return Err(AppError(GateError::TokenExpired));
        }

        let user = state
            .user_repo
            .find_user_by_id(access_token.user_id)
            .await?
            .ok_or(AppError(GateError::UserNotFound))?;

        Ok(AuthenticatedUser {
            user,
            _marker: PhantomData,
        })
    }
}
