//! `SQLite` repositories. Enable the `sqlx_sqlite` feature.
//!
//! Run [`migrations::run`] once on the pool before using them.

pub mod migrations;
mod projects;
mod token;
mod user;

use sqlx::SqlitePool;

pub use projects::SqliteProjectStore;
pub use token::SqliteTokenRepository;
pub use user::SqliteUserRepository;

use crate::GateError;

/// Builds every repository over one pool.
pub fn create_repositories(
    pool: SqlitePool,
) -> (SqliteUserRepository, SqliteTokenRepository, SqliteProjectStore) {
    (
        SqliteUserRepository::new(pool.clone()),
        SqliteTokenRepository::new(pool.clone()),
        SqliteProjectStore::new(pool),
    )
}

/// Logs a failed query and wraps it.
pub(crate) fn db_error(operation: &'static str, e: sqlx::Error) -> GateError {
    log::error!(
        target: "gatehouse",
        "msg=\"database error\", operation=\"{operation}\", error=\"{e}\""
    );
    GateError::DatabaseError(e.to_string())
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
