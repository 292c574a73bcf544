use std::sync::Arc;

use tracing::{debug, info, warn};

use swarmwatch_db::{KeyValueStore, load_json, save_json};
use swarmwatch_types::models::{Node, Notification, User};

use crate::directory::UserDirectory;
use crate::error::{Error, Result};
use crate::keys::SESSION_KEY;
use crate::notifications::NotificationLog;
use crate::registry::NodeRegistry;

/// The authenticated user of one dashboard instance plus the collections
/// cached for it.
#[derive(Debug, Clone)]
pub struct Session {
    user: User,
    nodes: Vec<Node>,
    notifications: Vec<Notification>,
}

impl Session {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }
}

/// Tracks at most one active session. Identity is passed explicitly from
/// here to the operations that need it.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    directory: UserDirectory,
    registry: NodeRegistry,
    notifications: NotificationLog,
    active: Option<Session>,
}

impl SessionManager {
    pub fn new(directory: UserDirectory) -> Self {
        Self {
            store: directory.store(),
            registry: NodeRegistry::new(directory.clone()),
            notifications: NotificationLog::new(directory.clone()),
            directory,
            active: None,
        }
    }

    /// On failure the current session, if any, is left as it was.
    pub fn login(&mut self, email: &str, password: &str) -> Result<&User> {
        let user = self.directory.verify_credentials(email, password)?;
        let session = self.load_session(user)?;
        save_json(self.store.as_ref(), SESSION_KEY, &session.user.id)?;

        info!("User {} logged in", session.user.username);
        Ok(&self.active.insert(session).user)
    }

    /// Drop the session and everything cached for it. Persisted node lists
    /// and notifications stay in the store.
    pub fn logout(&mut self) -> Result<()> {
        if let Some(session) = self.active.take() {
            info!("User {} logged out", session.user.username);
        }
        self.store.remove(SESSION_KEY)?;
        Ok(())
    }

    /// Re-establish the session recorded in the store, e.g. after a restart.
    pub fn restore(&mut self) -> Result<Option<&User>> {
        let Some(user_id) = load_json::<String>(self.store.as_ref(), SESSION_KEY)? else {
            return Ok(None);
        };

        let Some(user) = self.directory.find_by_id(&user_id)? else {
            warn!("Stored session points to unknown user {}, discarding", user_id);
            self.store.remove(SESSION_KEY)?;
            return Ok(None);
        };

        let session = self.load_session(user)?;
        debug!("Restored session for {}", session.user.username);
        Ok(Some(&self.active.insert(session).user))
    }

    /// Re-read the user record and cached collections from the store.
    pub fn reload(&mut self) -> Result<()> {
        let Some(current) = self.active.as_ref() else {
            return Err(Error::NotAuthenticated);
        };
        let user = self
            .directory
            .find_by_id(&current.user.id)?
            .ok_or_else(|| Error::UserNotFound(current.user.id.clone()))?;

        let session = self.load_session(user)?;
        self.active = Some(session);
        Ok(())
    }

    pub fn current_user(&self) -> Option<&User> {
        self.active.as_ref().map(|s| &s.user)
    }

    pub fn session(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    /// The active session, or `NotAuthenticated`.
    pub fn require(&self) -> Result<&Session> {
        self.active.as_ref().ok_or(Error::NotAuthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    fn load_session(&self, user: User) -> Result<Session> {
        Ok(Session {
            nodes: self.registry.list_nodes(&user.id)?,
            notifications: self.notifications.list_for_user(&user.id)?,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::fast_hasher;
    use swarmwatch_db::MemoryStore;

    fn setup() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let directory = UserDirectory::new(store.clone()).with_hasher(fast_hasher());
        directory.register("alice", "alice@example.com", "secret1").unwrap();
        (SessionManager::new(directory), store)
    }

    #[test]
    fn login_sets_current_user() {
        let (mut sessions, store) = setup();
        assert!(sessions.current_user().is_none());

        let user = sessions.login("alice@example.com", "secret1").unwrap().clone();
        assert_eq!(sessions.current_user(), Some(&user));
        assert!(store.get(SESSION_KEY).unwrap().is_some());
    }

    #[test]
    fn failed_login_propagates_and_keeps_state() {
        let (mut sessions, _) = setup();

        let err = sessions.login("alice@example.com", "wrong-pass").unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
        assert!(!sessions.is_authenticated());

        sessions.login("alice@example.com", "secret1").unwrap();
        sessions.login("alice@example.com", "wrong-pass").unwrap_err();
        assert!(sessions.is_authenticated());
    }

    #[test]
    fn logout_clears_everything() {
        let (mut sessions, store) = setup();
        sessions.login("alice@example.com", "secret1").unwrap();

        sessions.logout().unwrap();
        assert!(sessions.current_user().is_none());
        assert!(sessions.session().is_none());
        assert!(store.get(SESSION_KEY).unwrap().is_none());
        assert!(matches!(sessions.require().unwrap_err(), Error::NotAuthenticated));

        // Logging out twice is harmless.
        sessions.logout().unwrap();
    }

    #[test]
    fn restore_picks_up_stored_session() {
        let (mut sessions, store) = setup();
        let user_id = sessions.login("alice@example.com", "secret1").unwrap().id.clone();

        let directory = UserDirectory::new(store.clone());
        let mut fresh = SessionManager::new(directory);
        let restored = fresh.restore().unwrap().unwrap();
        assert_eq!(restored.id, user_id);
    }

    #[test]
    fn restore_discards_stale_session() {
        let (mut sessions, store) = setup();
        save_json(store.as_ref(), SESSION_KEY, "ghost").unwrap();

        assert!(sessions.restore().unwrap().is_none());
        assert!(store.get(SESSION_KEY).unwrap().is_none());
    }

    #[test]
    fn reload_requires_session() {
        let (mut sessions, _) = setup();
        assert!(matches!(sessions.reload().unwrap_err(), Error::NotAuthenticated));

        sessions.login("alice@example.com", "secret1").unwrap();
        sessions.reload().unwrap();
        assert!(sessions.session().unwrap().nodes().is_empty());
    }
}
