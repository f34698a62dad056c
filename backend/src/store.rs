use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;
use shared::models::*;
use shared::tally::{rank_options, VoteChange};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Email is already registered")]
    DuplicateEmail,
    #[error("Store lock poisoned")]
    LockPoisoned,
}

#[rocket::async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn update_user(&self, id: Uuid, changes: &UserChanges) -> Result<Option<User>, StoreError>;
    /// Removes the user and retracts their vote in one step. `false` if the user does not exist.
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[rocket::async_trait]
pub trait VoteStore: Send + Sync {
    async fn find_vote(&self, user_id: Uuid) -> Result<Option<Vote>, StoreError>;
    /// Creates or changes the user's vote and adjusts option counts atomically.
    async fn record_vote(&self, user_id: Uuid, option: &str) -> Result<VoteChange, StoreError>;
    /// Registers an option with a zero count unless it already exists.
    async fn ensure_option(&self, name: &str) -> Result<VoteOption, StoreError>;
    async fn list_options(&self) -> Result<Vec<VoteOption>, StoreError>;
    async fn ranked_options(&self) -> Result<Vec<VoteOption>, StoreError>;
    async fn count_votes(&self) -> Result<i64, StoreError>;
}

pub trait Store: UserStore + VoteStore {}

impl<T: UserStore + VoteStore> Store for T {}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    votes: HashMap<Uuid, Vote>,
    options: Vec<VoteOption>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users.iter().any(|u| u.email == email && Some(u.id) != except)
    }

    fn decrement(&mut self, name: &str) {
        if let Some(option) = self.options.iter_mut().find(|o| o.name == name) {
            option.count -= 1;
        }
    }

    fn increment(&mut self, name: &str) {
        match self.options.iter_mut().find(|o| o.name == name) {
            Some(option) => option.count += 1,
            None => self.options.push(VoteOption { count: 1, ..VoteOption::new(name) }),
        }
    }
}

/// Process-local store; every operation runs under a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn snapshot_votes(&self) -> Result<Vec<Vote>, StoreError> {
        Ok(self.tables()?.votes.values().cloned().collect())
    }
}

#[rocket::async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables()?;
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User::new(user);
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables()?.users.clone())
    }

    async fn update_user(&self, id: Uuid, changes: &UserChanges) -> Result<Option<User>, StoreError> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.apply(changes);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;
        let Some(index) = tables.users.iter().position(|u| u.id == id) else {
            return Ok(false);
        };
        tables.users.remove(index);
        if let Some(vote) = tables.votes.remove(&id) {
            tables.decrement(&vote.option);
        }
        Ok(true)
    }
}

#[rocket::async_trait]
impl VoteStore for MemoryStore {
    async fn find_vote(&self, user_id: Uuid) -> Result<Option<Vote>, StoreError> {
        Ok(self.tables()?.votes.get(&user_id).cloned())
    }

    async fn record_vote(&self, user_id: Uuid, option: &str) -> Result<VoteChange, StoreError> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;

        let change = match tables.votes.entry(user_id) {
            Entry::Occupied(mut entry) => {
                let change = VoteChange::plan(Some(entry.get().option.as_str()), option);
                entry.get_mut().change_option(option);
                change
            }
            Entry::Vacant(entry) => {
                entry.insert(Vote::new(user_id, option));
                VoteChange::plan(None, option)
            }
        };

        for (name, delta) in change.adjustments() {
            if delta < 0 {
                tables.decrement(name);
            } else {
                tables.increment(name);
            }
        }
        Ok(change)
    }

    async fn ensure_option(&self, name: &str) -> Result<VoteOption, StoreError> {
        let mut tables = self.tables()?;
        if let Some(existing) = tables.options.iter().find(|o| o.name == name) {
            return Ok(existing.clone());
        }
        let option = VoteOption::new(name);
        tables.options.push(option.clone());
        Ok(option)
    }

    async fn list_options(&self) -> Result<Vec<VoteOption>, StoreError> {
        Ok(self.tables()?.options.clone())
    }

    async fn ranked_options(&self) -> Result<Vec<VoteOption>, StoreError> {
        Ok(rank_options(self.tables()?.options.clone()))
    }

    async fn count_votes(&self) -> Result<i64, StoreError> {
        Ok(self.tables()?.votes.len() as i64)
    }
}
