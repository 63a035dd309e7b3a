#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::repository::{
    CreateInvite, CreateMember, CreateProject, InviteAcceptance, InviteRepository,
    MemberRepository, ProjectRepository,
};
use super::types::{Invite, InviteStatus, Member, Project, Role, transition_error};
use crate::GateError;

#[derive(Default)]
struct StoreState {
    projects: HashMap<i64, Project>,
    members: HashMap<i64, Member>,
    invites: HashMap<i64, Invite>,
    next_project_id: i64,
    next_member_id: i64,
    next_invite_id: i64,
}

impl StoreState {
    fn owner_of(&self, project_id: i64) -> Option<&Member> {
        self.members
            .values()
            .find(|m| m.project_id == project_id && m.role == Role::Owner)
    }

    fn member_of(&self, project_id: i64, user_id: i64) -> Option<&Member> {
        self.members
            .values()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
    }

    fn insert_member(&mut self, project_id: i64, user_id: i64, role: Role) -> Member {
        self.next_member_id += 1;
        let now = Utc::now();
        let member = Member {
            id: self.next_member_id,
            project_id,
            user_id,
            role,
            created_at: now,
            updated_at: now,
        };
        self.members.insert(member.id, member.clone());
        member
    }

    fn set_role(&mut self, id: i64, role: Role) -> Result<Member, GateError> {
        let member = self.members.get_mut(&id).ok_or(GateError::NotFound)?;
        member.role = role;
        member.updated_at = Utc::now();
        Ok(member.clone())
    }
}

/// In-memory project, member and invite store.
///
/// One lock guards all three tables, so every multi-row operation is atomic.
/// Clones share state: hand a clone to each service that needs a repository.
#[derive(Clone, Default)]
pub struct MockProjectStore {
    state: Arc<RwLock<StoreState>>,
}

impl MockProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, GateError> {
        self.state
            .read()
            .map_err(|_| GateError::Internal("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, GateError> {
        self.state
            .write()
            .map_err(|_| GateError::Internal("lock poisoned".into()))
    }

    /// Overwrites an invite's deadline.
    pub fn set_invite_expiry(&self, id: i64, expires_at: DateTime<Utc>) -> Result<(), GateError> {
        let mut state = self.write()?;
        let invite = state.invites.get_mut(&id).ok_or(GateError::NotFound)?;
        invite.expires_at = expires_at;
        Ok(())
    }

    /// Number of OWNER members in a project.
    pub fn owner_count(&self, project_id: i64) -> Result<usize, GateError> {
        Ok(self
            .read()?
            .members
            .values()
            .filter(|m| m.project_id == project_id && m.role == Role::Owner)
            .count())
    }
}

#[async_trait]
impl ProjectRepository for MockProjectStore {
    async fn create(&self, data: CreateProject) -> Result<(Project, Member), GateError> {
        let mut state = self.write()?;
        state.next_project_id += 1;
        let now = Utc::now();
        let project = Project {
            id: state.next_project_id,
            name: data.name,
            description: data.description,
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(project.id, project.clone());
        let owner = state.insert_member(project.id, data.owner_user_id, Role::Owner);

        Ok((project, owner))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Project>, GateError> {
        Ok(self.read()?.projects.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), GateError> {
        let mut state = self.write()?;
        state.projects.remove(&id);
        state.members.retain(|_, m| m.project_id != id);
        state.invites.retain(|_, i| i.project_id != id);
        Ok(())
    }
}

#[async_trait]
impl MemberRepository for MockProjectStore {
    async fn create(&self, data: CreateMember) -> Result<Member, GateError> {
        let mut state = self.write()?;
        if !state.projects.contains_key(&data.project_id) {
            return Err(GateError::NotFound);
        }
        if state.member_of(data.project_id, data.user_id).is_some() {
            return Err(GateError::AlreadyMember);
        }
        if data.role == Role::Owner && state.owner_of(data.project_id).is_some() {
            return Err(GateError::Conflict);
        }

        Ok(state.insert_member(data.project_id, data.user_id, data.role))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Member>, GateError> {
        Ok(self.read()?.members.get(&id).cloned())
    }

    async fn find_by_project_and_user(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Member>, GateError> {
        Ok(self.read()?.member_of(project_id, user_id).cloned())
    }

    async fn find_by_project(&self, project_id: i64) -> Result<Vec<Member>, GateError> {
        let state = self.read()?;
        let mut members: Vec<Member> = state
            .members
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    async fn update_role(&self, id: i64, expected: Role, role: Role) -> Result<Member, GateError> {
        let mut state = self.write()?;
        let current = state.members.get(&id).ok_or(GateError::Conflict)?;
        if current.role != expected {
            return Err(GateError::Conflict);
        }
        if role == Role::Owner && state.owner_of(current.project_id).is_some() {
            return Err(GateError::Conflict);
        }

        state.set_role(id, role)
    }

    async fn delete(&self, id: i64, expected: Role) -> Result<(), GateError> {
        let mut state = self.write()?;
        match state.members.get(&id) {
            Some(m) if m.role == expected => {
                state.members.remove(&id);
                Ok(())
            }
            _ => Err(GateError::Conflict),
        }
    }

    async fn transfer_ownership(
        &self,
        from_id: i64,
        to_id: i64,
        to_expected: Role,
    ) -> Result<(Member, Member), GateError> {
        let mut state = self.write()?;
        let from = state.members.get(&from_id).ok_or(GateError::Conflict)?;
        let to = state.members.get(&to_id).ok_or(GateError::Conflict)?;
        if from.role != Role::Owner || to.role != to_expected || from.project_id != to.project_id
        {
            return Err(GateError::Conflict);
        }

        let previous = state.set_role(from_id, Role::Admin)?;
        let owner = state.set_role(to_id, Role::Owner)?;

        Ok((owner, previous))
    }
}

#[async_trait]
impl InviteRepository for MockProjectStore {
    async fn create(&self, data: CreateInvite, now: DateTime<Utc>) -> Result<Invite, GateError> {
        let mut state = self.write()?;
        if !state.projects.contains_key(&data.project_id) {
            return Err(GateError::NotFound);
        }
        if state.invites.values().any(|i| {
            i.project_id == data.project_id && i.email == data.email && i.is_live_at(now)
        }) {
            return Err(GateError::DuplicatePendingInvite);
        }

        state.next_invite_id += 1;
        let invite = Invite {
            id: state.next_invite_id,
            project_id: data.project_id,
            email: data.email,
            role: data.role,
            message: data.message,
            inviter_user_id: data.inviter_user_id,
            token_hash: data.token_hash,
            status: InviteStatus::Pending,
            accepted_by: None,
            created_at: now,
            updated_at: now,
            expires_at: data.expires_at,
            responded_at: None,
        };
        state.invites.insert(invite.id, invite.clone());

        Ok(invite)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Invite>, GateError> {
        Ok(self.read()?.invites.get(&id).cloned())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Invite>, GateError> {
        Ok(self
            .read()?
            .invites
            .values()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn find_pending_by_project(
        &self,
        project_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invite>, GateError> {
        let state = self.read()?;
        let mut invites: Vec<Invite> = state
            .invites
            .values()
            .filter(|i| i.project_id == project_id && i.is_live_at(now))
            .cloned()
            .collect();
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(invites)
    }

    async fn transition(
        &self,
        id: i64,
        to: InviteStatus,
        now: DateTime<Utc>,
    ) -> Result<Invite, GateError> {
        let mut state = self.write()?;
        let invite = match state.invites.get_mut(&id) {
            Some(invite) if invite.is_live_at(now) => invite,
            other => return Err(transition_error(other.map(|i| &*i), now)),
        };

        invite.status = to;
        invite.responded_at = Some(now);
        invite.updated_at = now;

        Ok(invite.clone())
    }

    async fn refresh(
        &self,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Invite, GateError> {
        let mut state = self.write()?;
        let invite = state.invites.get_mut(&id).ok_or(GateError::NotFound)?;
        if invite.status != InviteStatus::Pending {
            return Err(GateError::InvalidState);
        }

        token_hash.clone_into(&mut invite.token_hash);
        invite.expires_at = expires_at;
        invite.updated_at = now;

        Ok(invite.clone())
    }

    async fn accept(
        &self,
        id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<InviteAcceptance, GateError> {
        let mut state = self.write()?;
        let invite = match state.invites.get(&id) {
            Some(invite) if invite.is_live_at(now) => invite.clone(),
            other => return Err(transition_error(other, now)),
        };
        if !state.projects.contains_key(&invite.project_id) {
            return Err(GateError::NotFound);
        }

        let existing = state.member_of(invite.project_id, user_id).cloned();
        let (member, newly_joined) = match existing {
            Some(member) if invite.role != Role::Owner || member.role == Role::Owner => {
                (member, false)
            }
            existing => {
                if invite.role == Role::Owner {
                    // only the owner who issued it can still hand over ownership
                    let owner_id = match state.owner_of(invite.project_id) {
                        Some(owner) if owner.user_id == invite.inviter_user_id => owner.id,
                        _ => return Err(GateError::Forbidden),
                    };
                    state.set_role(owner_id, Role::Admin)?;
                }
                match existing {
                    Some(member) => (state.set_role(member.id, invite.role)?, false),
                    None => (state.insert_member(invite.project_id, user_id, invite.role), true),
                }
            }
        };

        let invite = state.invites.get_mut(&id).ok_or(GateError::NotFound)?;
        invite.status = InviteStatus::Accepted;
        invite.accepted_by = Some(user_id);
        invite.responded_at = Some(now);
        invite.updated_at = now;

        Ok(InviteAcceptance {
            invite: invite.clone(),
            member,
            newly_joined,
        })
    }

    async fn delete_stale(&self, before: DateTime<Utc>) -> Result<u64, GateError> {
        let mut state = self.write()?;
        let initial = state.invites.len();
        state.invites.retain(|_, i| match i.status {
            InviteStatus::Pending => i.expires_at >= before,
            _ => i.updated_at >= before,
        });
        Ok((initial - state.invites.len()) as u64)
    }
}
