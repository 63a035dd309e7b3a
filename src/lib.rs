//! Project membership, role policy and invitation lifecycle.
//!
//! `gatehouse` decides who may act on a shared project and how new members
//! are admitted. It is organised the same way from the bottom up:
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`projects::policy`] | Pure role-hierarchy rules (`OWNER > ADMIN > MEMBER > VIEWER`) |
//! | [`projects::InviteStore`] | Invite creation, token lookup, guarded transitions, lazy expiry |
//! | [`projects::MembershipService`] | Role changes, ownership transfer, removal |
//! | [`projects::InviteService`] | Batch invites, preview, accept, decline, cancel, resend |
//! | [`auth_bridge`] | Auto-accept of an invite token during signup/login |
//!
//! Storage is abstracted behind repository traits. Enable `mocks` for the
//! in-memory store, `sqlx_sqlite` for the `SQLite` backend and `axum_api` for
//! the HTTP routes.

pub mod actions;
pub mod auth_bridge;
pub mod config;
pub mod crypto;
pub mod events;
pub mod projects;
pub mod repository;
mod secret;
pub mod validators;

#[cfg(feature = "axum_api")]
pub mod api;

#[cfg(feature = "sqlx_sqlite")]
pub mod sqlite;

use std::fmt;

pub use auth_bridge::{AuthBridge, AuthOutcome, InviteAcceptor};
pub use config::GatehouseConfig;
pub use events::{dispatch, register_event_listeners};
#[cfg(any(test, feature = "mocks"))]
pub use repository::{MockTokenRepository, MockUserRepository};
pub use repository::{AccessToken, AuthUser, TokenRepository, UserRepository};
pub use secret::SecretString;

/// Every failure the crate can report.
///
/// Policy functions never produce these; they return booleans that callers
/// translate into [`GateError::Forbidden`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The referenced project, member or invite does not exist.
    NotFound,
    /// The invite is past its deadline.
    Expired,
    /// The invite is not in the lifecycle stage the operation requires.
    InvalidState,
    /// The role policy rejected the action.
    Forbidden,
    /// A concurrent mutation changed the row between read and write.
    Conflict,
    /// The operation would leave the project without an owner.
    LastOwner,
    /// The user already holds a role in the project.
    AlreadyMember,
    /// A live pending invite already exists for this project and email.
    DuplicatePendingInvite,
    /// The authenticated email differs from the invited one and the policy rejects it.
    EmailMismatch,
    InvalidEmail,
    InvalidPassword,
    Validation(String),
    UserNotFound,
    UserAlreadyExists,
    InvalidCredentials,
    TokenInvalid,
    TokenExpired,
    PasswordHashError,
    DatabaseError(String),
    Internal(String),
}

impl GateError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Expired => "EXPIRED",
            Self::InvalidState => "INVALID_STATE",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::LastOwner => "LAST_OWNER",
            Self::AlreadyMember => "ALREADY_MEMBER",
            Self::DuplicatePendingInvite => "DUPLICATE_PENDING_INVITE",
            Self::EmailMismatch => "EMAIL_MISMATCH",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::UserAlreadyExists => "USER_ALREADY_EXISTS",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::PasswordHashError => "PASSWORD_HASH_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Idempotency guards that callers frequently treat as success.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyMember | Self::DuplicatePendingInvite)
    }
}

impl std::error::Error for GateError {}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Not found"),
            Self::Expired => write!(f, "This invite has expired, ask for a new invite"),
            Self::InvalidState => write!(f, "This invite is no longer pending"),
            Self::Forbidden => write!(f, "You are not allowed to perform this action"),
            Self::Conflict => write!(f, "The member was modified concurrently, reload and retry"),
            Self::LastOwner => write!(
                f,
                "A project must keep its owner, transfer ownership first"
            ),
            Self::AlreadyMember => write!(f, "User is already a member of this project"),
            Self::DuplicatePendingInvite => {
                write!(f, "A pending invite already exists for this email")
            }
            Self::EmailMismatch => write!(
                f,
                "This invite was sent to a different email, sign in with the correct account"
            ),
            Self::InvalidEmail => write!(f, "Invalid email format"),
            Self::InvalidPassword => write!(f, "Invalid password"),
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::UserNotFound => write!(f, "User not found"),
            Self::UserAlreadyExists => write!(f, "User already exists"),
            Self::InvalidCredentials => write!(f, "Invalid email or password"),
            Self::TokenInvalid => write!(f, "Invalid token"),
            Self::TokenExpired => write!(f, "Token has expired"),
            Self::PasswordHashError => write!(f, "Failed to hash password"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl From<validators::ValidationError> for GateError {
    fn from(err: validators::ValidationError) -> Self {
        match err {
            validators::ValidationError::EmailEmpty
            | validators::ValidationError::EmailTooLong
            | validators::ValidationError::EmailInvalidFormat => Self::InvalidEmail,
            other => Self::Validation(other.to_string()),
        }
    }
}
