//! Configuration for invites and sessions.
//!
//! ```rust
//! use chrono::Duration;
//! use gatehouse::config::{EmailMismatchPolicy, GatehouseConfig, InviteConfig};
//!
//! let config = GatehouseConfig {
//!     invites: InviteConfig {
//!         ttl: Duration::days(3),
//!         email_mismatch: EmailMismatchPolicy::Reject,
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert_eq!(config.invites.max_batch_size, 50);
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct GatehouseConfig {
    pub invites: InviteConfig,
    pub sessions: SessionConfig,
}

impl GatehouseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Long-lived invites and sessions for local work.
    pub fn development() -> Self {
        Self {
            invites: InviteConfig {
                ttl: Duration::days(30),
                max_batch_size: 200,
                ..InviteConfig::default()
            },
            sessions: SessionConfig {
                access_token_expiry: Duration::days(30),
            },
        }
    }

    /// Short invite lifetime and a hard block on email mismatch.
    pub fn strict() -> Self {
        Self {
            invites: InviteConfig {
                ttl: Duration::days(2),
                max_batch_size: 20,
                email_mismatch: EmailMismatchPolicy::Reject,
                purge_after: Duration::days(7),
            },
            sessions: SessionConfig {
                access_token_expiry: Duration::hours(12),
            },
        }
    }
}

/// What to do when the signed-in email differs from the invited email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailMismatchPolicy {
    /// Accept, but flag the outcome so the client can show a warning.
    #[default]
    Warn,
    /// Refuse with `GateError::EmailMismatch`.
    Reject,
}

#[derive(Debug, Clone)]
pub struct InviteConfig {
    /// Lifetime of a freshly issued or resent invite.
    ///
    /// Default: 7 days
    pub ttl: Duration,

    /// Maximum number of rows accepted by one batch request.
    ///
    /// Default: 50
    pub max_batch_size: usize,

    /// Default: `EmailMismatchPolicy::Warn`
    pub email_mismatch: EmailMismatchPolicy,

    /// Age after which answered or expired invites may be purged.
    ///
    /// Default: 30 days
    pub purge_after: Duration,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::days(7),
            max_batch_size: 50,
            email_mismatch: EmailMismatchPolicy::Warn,
            purge_after: Duration::days(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Default: 7 days
    pub access_token_expiry: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_expiry: Duration::days(7),
        }
    }
}
