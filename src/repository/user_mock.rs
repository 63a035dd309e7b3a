use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use super::user::{AuthUser, UserRepository};
use crate::GateError;

#[derive(Clone, Default)]
pub struct MockUserRepository {
    pub users: Arc<Mutex<Vec<AuthUser>>>,
    next_id: Arc<AtomicI64>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AuthUser>>, GateError> {
        self.users
            .lock()
            .map_err(|_| GateError::Internal("lock poisoned".into()))
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<AuthUser>, GateError> {
        Ok(self.lock()?.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, GateError> {
        Ok(self
            .lock()?
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(
        &self,
        email: &str,
        name: &str,
        hashed_password: &str,
    ) -> Result<AuthUser, GateError> {
        let mut users = self.lock()?;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(GateError::UserAlreadyExists);
        }

        let now = Utc::now();
        let user = AuthUser {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            email: email.to_owned(),
            name: name.to_owned(),
            hashed_password: hashed_password.to_owned(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());

        Ok(user)
    }
}
