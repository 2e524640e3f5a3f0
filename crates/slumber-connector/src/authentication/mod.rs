//! Remote-user authentication backend.
//!
//! The username arrives from a trusted upstream (normally a request header).
//! The backend looks it up on the remote authentication service, mirrors the
//! record into a local [`ShadowUser`], and answers permission checks from
//! the remote service.

mod remote_user;
mod store;

pub use remote_user::*;
pub use store::*;

use slumber_core::SlumberResult;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Authentication backend backed by a remote user service.
#[derive(Clone)]
pub struct RemoteUserBackend {
    service: Arc<dyn RemoteUserService>,
    store: Arc<dyn ShadowUserStore>,
}

impl RemoteUserBackend {
    /// Creates a backend over a remote user service and a local user store.
    pub fn new(service: Arc<dyn RemoteUserService>, store: Arc<dyn ShadowUserStore>) -> Self {
        Self { service, store }
    }

    /// Authenticates an externally asserted username.
    ///
    /// Returns `Ok(None)` when the name is blank or unknown remotely; no local
    /// user is created in that case.
    pub async fn authenticate(&self, asserted: &str) -> SlumberResult<Option<ShadowUser>> {
        let username = asserted.trim();
        if username.is_empty() {
            return Ok(None);
        }
        self.get_user(username).await
    }

    /// Fetches the remote record for `username` and creates or updates the
    /// matching shadow user, with `remote_user` attached.
    pub async fn get_user(&self, username: &str) -> SlumberResult<Option<ShadowUser>> {
        let Some(remote) = self.service.find_user(username).await? else {
            warn!(username = %username, "Remote user not found");
            return Ok(None);
        };

        let mut user = self
            .store
            .find_by_username(&remote.username)
            .await?
            .unwrap_or_else(|| ShadowUser::new(remote.username.clone()));
        let created = user.id.is_none();
        user.sync_from(Arc::new(remote));

        let user = self.store.save(user).await?;
        info!(
            username = %user.username,
            id = ?user.id,
            created,
            "Remote user authenticated"
        );
        Ok(Some(user))
    }

    /// Permissions the user holds through groups.
    pub async fn get_group_permissions(&self, user: &ShadowUser) -> SlumberResult<BTreeSet<String>> {
        match self.active_remote(user).await? {
            Some(remote) => self.service.get_group_permissions(&remote).await,
            None => Ok(BTreeSet::new()),
        }
    }

    /// All permissions of the user.
    pub async fn get_all_permissions(&self, user: &ShadowUser) -> SlumberResult<BTreeSet<String>> {
        match self.active_remote(user).await? {
            Some(remote) => self.service.get_all_permissions(&remote).await,
            None => Ok(BTreeSet::new()),
        }
    }

    /// Checks a single `app_label.codename` permission.
    pub async fn has_perm(&self, user: &ShadowUser, perm: &str) -> SlumberResult<bool> {
        match self.active_remote(user).await? {
            Some(remote) => self.service.has_perm(&remote, perm).await,
            None => Ok(false),
        }
    }

    /// Checks whether the user has any permission in the app `module`.
    pub async fn has_module_perms(&self, user: &ShadowUser, module: &str) -> SlumberResult<bool> {
        match self.active_remote(user).await? {
            Some(remote) => self.service.has_module_perms(&remote, module).await,
            None => Ok(false),
        }
    }

    /// The user's remote record, refetched when not attached. Inactive
    /// users yield `None`.
    async fn active_remote(&self, user: &ShadowUser) -> SlumberResult<Option<Arc<RemoteUser>>> {
        if !user.is_active {
            return Ok(None);
        }
        if let Some(remote) = &user.remote_user {
            return Ok(Some(remote.clone()));
        }
        Ok(self.service.find_user(&user.username).await?.map(Arc::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use slumber_core::SlumberError;
    use std::collections::HashMap;

    /// Remote user service with canned users and permissions.
    #[derive(Default)]
    struct MockUserService {
        users: Mutex<HashMap<String, RemoteUser>>,
        permissions: Mutex<HashMap<String, (BTreeSet<String>, BTreeSet<String>)>>,
        unreachable: bool,
        lookups: Mutex<u32>,
    }

    impl MockUserService {
        fn with_user(user: RemoteUser) -> Self {
            let service = Self::default();
            service.users.lock().insert(user.username.clone(), user);
            service
        }

        fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::default()
            }
        }

        fn grant(&self, username: &str, group: &[&str], all: &[&str]) {
            self.permissions.lock().insert(
                username.to_string(),
                (
                    group.iter().map(|p| (*p).to_string()).collect(),
                    all.iter().map(|p| (*p).to_string()).collect(),
                ),
            );
        }
    }

    #[async_trait]
    impl RemoteUserService for MockUserService {
        async fn find_user(&self, username: &str) -> SlumberResult<Option<RemoteUser>> {
            *self.lookups.lock() += 1;
            if self.unreachable {
                return Err(SlumberError::improperly_configured("no 'auth' service"));
            }
            Ok(self.users.lock().get(username).cloned())
        }

        async fn get_group_permissions(&self, user: &RemoteUser) -> SlumberResult<BTreeSet<String>> {
            Ok(self
                .permissions
                .lock()
                .get(&user.username)
                .map(|(group, _)| group.clone())
                .unwrap_or_default())
        }

        async fn get_all_permissions(&self, user: &RemoteUser) -> SlumberResult<BTreeSet<String>> {
            Ok(self
                .permissions
                .lock()
                .get(&user.username)
                .map(|(_, all)| all.clone())
                .unwrap_or_default())
        }

        async fn has_perm(&self, user: &RemoteUser, perm: &str) -> SlumberResult<bool> {
            Ok(self.get_all_permissions(user).await?.contains(perm))
        }

        async fn has_module_perms(&self, user: &RemoteUser, module: &str) -> SlumberResult<bool> {
            let prefix = format!("{module}.");
            Ok(self
                .get_all_permissions(user)
                .await?
                .iter()
                .any(|perm| perm.starts_with(&prefix)))
        }
    }

    fn testuser() -> RemoteUser {
        RemoteUser {
            instance: None,
            username: "testuser".to_string(),
            is_active: true,
            is_staff: true,
            is_superuser: false,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: "test@example.com".to_string(),
            date_joined: Utc::now(),
        }
    }

    fn backend(service: MockUserService) -> (RemoteUserBackend, Arc<InMemoryShadowUserStore>) {
        let store = Arc::new(InMemoryShadowUserStore::new());
        (RemoteUserBackend::new(Arc::new(service), store.clone()), store)
    }

    #[tokio::test]
    async fn test_get_user_mirrors_remote_record() {
        let remote = testuser();
        let (backend, _) = backend(MockUserService::with_user(remote.clone()));

        let user = backend.get_user("testuser").await.unwrap().unwrap();
        assert_eq!(user.username, "testuser");
        assert!(user.is_active);
        assert!(user.is_staff);
        assert!(!user.is_superuser);

        let attached = user.remote_user.as_ref().unwrap();
        assert_eq!(attached.username, remote.username);
        assert_eq!(attached.is_active, remote.is_active);
        assert_eq!(attached.is_staff, remote.is_staff);
        assert_eq!(attached.is_superuser, remote.is_superuser);
        assert_eq!(attached.email, remote.email);
        assert_eq!(attached.date_joined, remote.date_joined);
        assert_eq!(user.date_joined, remote.date_joined);
    }

    #[tokio::test]
    async fn test_unknown_user_creates_nothing() {
        let (backend, store) = backend(MockUserService::default());

        let user = backend.authenticate("testuser").await.unwrap();
        assert!(user.is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_assertion_skips_lookup() {
        let service = Arc::new(MockUserService::with_user(testuser()));
        let store = Arc::new(InMemoryShadowUserStore::new());
        let backend = RemoteUserBackend::new(service.clone(), store);

        assert!(backend.authenticate("   ").await.unwrap().is_none());
        assert_eq!(*service.lookups.lock(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_fatal() {
        let (backend, store) = backend(MockUserService::unreachable());

        let err = backend.authenticate("testuser").await.unwrap_err();
        assert!(matches!(err, SlumberError::ImproperlyConfigured(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_existing_local_user_is_updated() {
        let mut remote = testuser();
        remote.username = "admin".to_string();
        let (backend, store) = backend(MockUserService::with_user(remote));

        let mut admin = ShadowUser::new("admin");
        admin.is_staff = false;
        let admin = store.save(admin).await.unwrap();

        let user = backend.authenticate("admin").await.unwrap().unwrap();
        assert_eq!(user.id, admin.id);
        assert!(user.is_staff);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_permissions_delegate_to_remote() {
        let service = MockUserService::with_user(testuser());
        service.grant("testuser", &["shop.change_pizza"], &["shop.change_pizza", "shop.add_pizza"]);
        let (backend, _) = backend(service);

        let user = backend.get_user("testuser").await.unwrap().unwrap();
        assert_eq!(backend.get_group_permissions(&user).await.unwrap().len(), 1);
        assert_eq!(backend.get_all_permissions(&user).await.unwrap().len(), 2);
        assert!(backend.has_perm(&user, "shop.add_pizza").await.unwrap());
        assert!(!backend.has_perm(&user, "slumber_test.add_pizza").await.unwrap());
        assert!(backend.has_module_perms(&user, "shop").await.unwrap());
        assert!(!backend.has_module_perms(&user, "slumber_test").await.unwrap());
    }

    #[tokio::test]
    async fn test_inactive_user_has_no_permissions() {
        let mut remote = testuser();
        remote.is_active = false;
        let service = MockUserService::with_user(remote);
        service.grant("testuser", &[], &["shop.add_pizza"]);
        let (backend, _) = backend(service);

        let user = backend.get_user("testuser").await.unwrap().unwrap();
        assert!(!user.is_active);
        assert!(!backend.has_perm(&user, "shop.add_pizza").await.unwrap());
        assert!(backend.get_all_permissions(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detached_user_refetches_remote() {
        let service = MockUserService::with_user(testuser());
        service.grant("testuser", &[], &["shop.add_pizza"]);
        let (backend, store) = backend(service);

        backend.get_user("testuser").await.unwrap();
        let restored = store.find_by_username("testuser").await.unwrap().unwrap();
        assert!(restored.remote_user.is_none());
        assert!(backend.has_perm(&restored, "shop.add_pizza").await.unwrap());
    }
}
