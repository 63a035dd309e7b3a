//! Core types for projects, members and invites.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::GateError;

/// Project role, totally ordered by privilege.
///
/// Stored as lowercase text, sent over the wire in upper case. Parsing
/// accepts either.
///
/// ```rust
/// use gatehouse::projects::Role;
///
/// assert!(Role::Owner > Role::Admin);
/// assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
/// assert_eq!("VIEWER".parse::<Role>().unwrap(), Role::Viewer);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[serde(alias = "viewer")]
    Viewer,
    #[serde(alias = "member")]
    Member,
    #[serde(alias = "admin")]
    Admin,
    #[serde(alias = "owner")]
    Owner,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Role; 4] = [Role::Viewer, Role::Member, Role::Admin, Role::Owner];

    pub const fn rank(self) -> u8 {
        match self {
            Self::Viewer => 0,
            Self::Member => 1,
            Self::Admin => 2,
            Self::Owner => 3,
        }
    }

    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// OWNER or ADMIN.
    pub const fn is_manager(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for Role {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            _ => Err(GateError::Validation(format!("Unknown role: {s}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invite lifecycle stage.
///
/// `Expired` is never persisted. It is derived from a pending row whose
/// deadline has passed, see [`Invite::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
    Expired,
}

impl InviteStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl FromStr for InviteStatus {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(GateError::Validation(format!("Unknown invite status: {s}"))),
        }
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's role in a project. Unique on `(project_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An invitation to join a project with a given role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub id: i64,
    pub project_id: i64,
    /// Normalized (trimmed, lowercased).
    pub email: String,
    pub role: Role,
    pub message: Option<String>,
    pub inviter_user_id: i64,
    /// SHA-256 of the invite token.
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// Persisted status, never `Expired`.
    pub status: InviteStatus,
    /// Set once the invite is accepted.
    pub accepted_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invite {
    /// Past its deadline. The deadline instant itself is still live.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Pending and not yet past its deadline.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.status == InviteStatus::Pending && !self.is_expired_at(now)
    }

    /// Status as observed at `now`, with lazy expiry applied.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InviteStatus {
        if self.status == InviteStatus::Pending && self.is_expired_at(now) {
            InviteStatus::Expired
        } else {
            self.status
        }
    }
}

/// Classifies why a guarded transition did not apply.
///
/// For repository implementations: call it after a conditional update
/// touched no row, with the row re-read.
pub fn transition_error(invite: Option<&Invite>, now: DateTime<Utc>) -> GateError {
    match invite {
        None => GateError::NotFound,
        Some(invite) => match invite.effective_status(now) {
            InviteStatus::Expired => GateError::Expired,
            _ => GateError::InvalidState,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn invite(status: InviteStatus, expires_in: Duration) -> Invite {
        let now = Utc::now();
        Invite {
            id: 1,
            project_id: 1,
            email: "bob@x.com".to_owned(),
            role: Role::Member,
            message: None,
            inviter_user_id: 1,
            token_hash: "hash".to_owned(),
            status,
            accepted_by: None,
            created_at: now,
            updated_at: now,
            expires_at: now + expires_in,
            responded_at: None,
        }
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Owner > Role::Admin);
        assert!(Role::Admin > Role::Member);
        assert!(Role::Member > Role::Viewer);

        let mut sorted = Role::ALL;
        sorted.sort();
        assert_eq!(sorted, Role::ALL);
    }

    #[test]
    fn test_role_parse_either_case() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(role.as_str().to_uppercase().parse::<Role>().unwrap(), role);
        }
        assert!(matches!("boss".parse::<Role>(), Err(GateError::Validation(_))));
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, Role::Viewer);
    }

    #[test]
    fn test_effective_status() {
        let now = Utc::now();

        let live = invite(InviteStatus::Pending, Duration::days(1));
        assert_eq!(live.effective_status(now), InviteStatus::Pending);
        assert!(live.is_live_at(now));

        let stale = invite(InviteStatus::Pending, Duration::days(-1));
        assert_eq!(stale.effective_status(now), InviteStatus::Expired);
        assert!(!stale.is_live_at(now));

        // terminal states are not overridden by expiry
        let declined = invite(InviteStatus::Declined, Duration::days(-1));
        assert_eq!(declined.effective_status(now), InviteStatus::Declined);
    }

    #[test]
    fn test_expiry_boundary() {
        let at_deadline = invite(InviteStatus::Pending, Duration::zero());
        let deadline = at_deadline.expires_at;

        assert!(at_deadline.is_live_at(deadline));
        assert_eq!(at_deadline.effective_status(deadline), InviteStatus::Pending);

        let after = deadline + Duration::milliseconds(1);
        assert!(at_deadline.is_expired_at(after));
        assert_eq!(at_deadline.effective_status(after), InviteStatus::Expired);
    }

    #[test]
    fn test_transition_error() {
        let now = Utc::now();
        assert_eq!(transition_error(None, now), GateError::NotFound);

        let stale = invite(InviteStatus::Pending, Duration::days(-1));
        assert_eq!(transition_error(Some(&stale), now), GateError::Expired);

        let accepted = invite(InviteStatus::Accepted, Duration::days(1));
        assert_eq!(transition_error(Some(&accepted), now), GateError::InvalidState);
    }

    #[test]
    fn test_token_hash_not_serialized() {
        let json = serde_json::to_value(invite(InviteStatus::Pending, Duration::days(1))).unwrap();
        assert!(json.get("token_hash").is_none());
    }
}
