//! Storage traits for the identities the project core consumes.
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`UserRepository`] | User accounts |
//! | [`TokenRepository`] | Opaque bearer tokens |
//!
//! Project, member and invite storage lives in [`crate::projects`].
//! Enable the `mocks` feature for in-memory implementations.

mod token;
mod user;

#[cfg(any(test, feature = "mocks"))]
mod token_mock;
#[cfg(any(test, feature = "mocks"))]
mod user_mock;

pub use token::{AccessToken, TokenRepository};
pub use user::{AuthUser, UserRepository};

#[cfg(any(test, feature = "mocks"))]
pub use token_mock::MockTokenRepository;
#[cfg(any(test, feature = "mocks"))]
pub use user_mock::MockUserRepository;
