//! Role hierarchy rules.
//!
//! Everything here is a pure function of role values and an "acting on
//! myself" flag. Callers turn a `false` into [`GateError::Forbidden`]
//! (or a more specific error where one applies).
//!
//! [`GateError::Forbidden`]: crate::GateError::Forbidden

use super::Role;

/// Whether `actor` may change the role of a member currently holding `target`.
///
/// Rules, in order:
/// 1. Only OWNER or ADMIN may change roles at all.
/// 2. An OWNER's role can only be changed by that owner, and only as an
///    ownership transfer to someone else.
/// 3. An ADMIN cannot change another ADMIN's role.
pub fn can_change_role(actor: Role, target: Role, actor_is_target: bool) -> bool {
    if !actor.is_manager() {
        return false;
    }

    if target == Role::Owner {
        return actor_is_target;
    }

    if actor == Role::Admin && target >= Role::Admin && !actor_is_target {
        return false;
    }

    true
}

/// Roles `actor` may assign to a member currently holding `current`.
///
/// OWNER may pick any other role, OWNER included (a transfer). ADMIN may
/// pick any other role below OWNER. Everyone else gets nothing.
pub fn available_target_roles(actor: Role, current: Role) -> Vec<Role> {
    match actor {
        Role::Owner => Role::ALL.into_iter().filter(|r| *r != current).collect(),
        Role::Admin => Role::ALL
            .into_iter()
            .filter(|r| *r != current && *r != Role::Owner)
            .collect(),
        Role::Member | Role::Viewer => Vec::new(),
    }
}

/// Whether `actor` may remove a member holding `target`.
///
/// The owner is never removable directly, not even by itself. Anyone else
/// may leave on their own. Removing others needs OWNER, or ADMIN acting on
/// someone below ADMIN.
pub fn can_remove(actor: Role, target: Role, actor_is_target: bool) -> bool {
    if target == Role::Owner {
        return false;
    }

    if actor_is_target {
        return true;
    }

    match actor {
        Role::Owner => true,
        Role::Admin => target < Role::Admin,
        Role::Member | Role::Viewer => false,
    }
}

/// Whether `actor` may issue, list, resend or cancel invites.
pub fn can_manage_invites(actor: Role) -> bool {
    actor.is_manager()
}

/// Whether `actor` may issue an invite granting `invite_role`.
///
/// Only the owner may hand out OWNER through an invite.
pub fn can_invite_as(actor: Role, invite_role: Role) -> bool {
    can_manage_invites(actor) && (invite_role != Role::Owner || actor == Role::Owner)
}
