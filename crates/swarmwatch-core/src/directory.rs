use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use swarmwatch_db::{KeyValueStore, load_json, save_json};
use swarmwatch_types::models::User;

use crate::error::{Error, Result};
use crate::keys::USERS_KEY;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Registered accounts, persisted as a single JSON list.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn KeyValueStore>,
    hasher: Argon2<'static>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            hasher: Argon2::default(),
        }
    }

    /// Use custom Argon2 parameters for new hashes. Existing hashes keep
    /// verifying with the parameters encoded in them.
    pub fn with_hasher(mut self, hasher: Argon2<'static>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let username = username.trim();
        let email = email.trim();

        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(Error::Validation(format!(
                "username must be at least {} characters",
                MIN_USERNAME_LEN
            )));
        }
        if !is_valid_email(email) {
            return Err(Error::Validation(format!("'{}' is not a valid email address", email)));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let mut users = self.load_users()?;
        if users.iter().any(|u| u.email == email) {
            return Err(Error::DuplicateEmail);
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::PasswordHash(e.to_string()))?
            .to_string();

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            node_ids: Vec::new(),
            notification_ids: Vec::new(),
            created_at: chrono::Utc::now(),
        };

        users.push(user.clone());
        self.save_users(&users)?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<User> {
        let user = self.find_by_email(email.trim())?.ok_or(Error::InvalidCredentials)?;

        let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|e| {
            warn!("Unreadable password hash for user {}: {}", user.id, e);
            Error::InvalidCredentials
        })?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| Error::InvalidCredentials)?;

        Ok(user)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.load_users()?.into_iter().find(|u| u.email == email))
    }

    pub fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.load_users()?.into_iter().find(|u| u.id == user_id))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.load_users()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Attach a node to its owner. Attaching twice is a no-op.
    pub fn add_node_to_user(&self, user_id: &str, node_id: &str) -> Result<User> {
        self.update_user(user_id, |user| {
            if user.owns_node(node_id) {
                return false;
            }
            user.node_ids.push(node_id.to_string());
            true
        })
    }

    pub fn remove_node_from_user(&self, user_id: &str, node_id: &str) -> Result<User> {
        self.update_user(user_id, |user| {
            let before = user.node_ids.len();
            user.node_ids.retain(|id| id != node_id);
            user.node_ids.len() != before
        })
    }

    pub fn add_notification_to_user(&self, user_id: &str, notification_id: &str) -> Result<User> {
        self.update_user(user_id, |user| {
            if user.owns_notification(notification_id) {
                return false;
            }
            user.notification_ids.push(notification_id.to_string());
            true
        })
    }

    pub fn clear_notifications_of_user(&self, user_id: &str) -> Result<User> {
        self.update_user(user_id, |user| {
            let changed = !user.notification_ids.is_empty();
            user.notification_ids.clear();
            changed
        })
    }

    /// Unknown users own nothing.
    pub fn get_user_node_ids(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self.find_by_id(user_id)?.map(|u| u.node_ids).unwrap_or_default())
    }

    pub fn get_user_notification_ids(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self
            .find_by_id(user_id)?
            .map(|u| u.notification_ids)
            .unwrap_or_default())
    }

    /// Apply `f` to the user and persist the directory if `f` reports a change.
    fn update_user<F>(&self, user_id: &str, f: F) -> Result<User>
    where
        F: FnOnce(&mut User) -> bool,
    {
        let mut users = self.load_users()?;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        let changed = f(user);
        let updated = user.clone();
        if changed {
            self.save_users(&users)?;
            debug!("Updated user {}", user_id);
        }
        Ok(updated)
    }

    fn load_users(&self) -> Result<Vec<User>> {
        Ok(load_json(self.store.as_ref(), USERS_KEY)?.unwrap_or_default())
    }

    fn save_users(&self, users: &[User]) -> Result<()> {
        save_json(self.store.as_ref(), USERS_KEY, users)?;
        Ok(())
    }
}

/// Basic shape check: `local@domain.tld`, no whitespace.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !host.ends_with('.'),
        None => false,
    }
}
