//! Projects, members and invites.
//!
//! [`policy`] holds the pure role rules. [`InviteStore`] owns the invite
//! lifecycle, [`MembershipService`] the member rows, and [`InviteService`]
//! ties both to users for batch invites and acceptance.

mod invitations;
mod invite_store;
mod membership;
pub mod policy;
mod repository;
mod types;

pub use invitations::{
    AcceptedInvite, BatchInviteError, BatchInviteOutcome, EMAIL_MISMATCH_WARNING, InvitePreview,
    InviteRow, InviteService, InviterSummary, ProjectSummary,
};
pub use invite_store::{InviteStore, IssuedInvite, NewInvite};
pub use membership::MembershipService;
pub use repository::{
    CreateInvite, CreateMember, CreateProject, InviteAcceptance, InviteRepository,
    MemberRepository, ProjectRepository,
};
pub use types::{Invite, InviteStatus, Member, Project, Role};
pub use types::transition_error;

#[cfg(any(test, feature = "mocks"))]
mod mocks;

#[cfg(any(test, feature = "mocks"))]
pub use mocks::MockProjectStore;
