//! Local shadow users.

use crate::RemoteUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use slumber_core::SlumberResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Local mirror of a remote user's authentication-relevant fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowUser {
    /// Local identifier; `None` until first saved.
    pub id: Option<u64>,
    pub username: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_joined: DateTime<Utc>,
    /// The remote record this user was last synchronized from. Not persisted.
    #[serde(skip)]
    pub remote_user: Option<Arc<RemoteUser>>,
}

impl ShadowUser {
    /// A new unsaved user with the given username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            date_joined: Utc::now(),
            remote_user: None,
        }
    }

    /// Copies the mirrored fields from a remote record and attaches it.
    pub fn sync_from(&mut self, remote: Arc<RemoteUser>) {
        self.username.clone_from(&remote.username);
        self.is_active = remote.is_active;
        self.is_staff = remote.is_staff;
        self.is_superuser = remote.is_superuser;
        self.first_name.clone_from(&remote.first_name);
        self.last_name.clone_from(&remote.last_name);
        self.email.clone_from(&remote.email);
        self.date_joined = remote.date_joined;
        self.remote_user = Some(remote);
    }

    /// Full name as `first last`, trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Persistence for shadow users. Users are never deleted.
#[async_trait]
pub trait ShadowUserStore: Send + Sync {
    /// Finds a user by username.
    async fn find_by_username(&self, username: &str) -> SlumberResult<Option<ShadowUser>>;

    /// Inserts or updates a user by username, assigning an id on first save.
    async fn save(&self, user: ShadowUser) -> SlumberResult<ShadowUser>;

    /// Number of stored users.
    async fn count(&self) -> SlumberResult<u64>;
}

/// In-memory [`ShadowUserStore`].
#[derive(Default)]
pub struct InMemoryShadowUserStore {
    users: RwLock<HashMap<String, ShadowUser>>,
    next_id: AtomicU64,
}

impl InMemoryShadowUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShadowUserStore for InMemoryShadowUserStore {
    async fn find_by_username(&self, username: &str) -> SlumberResult<Option<ShadowUser>> {
        Ok(self.users.read().get(username).cloned())
    }

    async fn save(&self, mut user: ShadowUser) -> SlumberResult<ShadowUser> {
        let mut users = self.users.write();
        if user.id.is_none() {
            user.id = users
                .get(&user.username)
                .and_then(|existing| existing.id)
                .or_else(|| Some(self.next_id.fetch_add(1, Ordering::SeqCst) + 1));
        }

        let mut stored = user.clone();
        stored.remote_user = None;
        users.insert(stored.username.clone(), stored);
        Ok(user)
    }

    async fn count(&self) -> SlumberResult<u64> {
        Ok(self.users.read().len() as u64)
    }
}
