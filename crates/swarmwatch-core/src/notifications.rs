use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use swarmwatch_db::{KeyValueStore, load_json, save_json};
use swarmwatch_types::models::{Node, NodeStatus, Notification};

use crate::directory::UserDirectory;
use crate::error::Result;
use crate::keys::NOTIFICATIONS_KEY;

/// Status-change events, newest first. The list is shared by all users;
/// each user sees the entries whose ids they own.
#[derive(Clone)]
pub struct NotificationLog {
    store: Arc<dyn KeyValueStore>,
    directory: UserDirectory,
}

impl NotificationLog {
    pub fn new(directory: UserDirectory) -> Self {
        Self {
            store: directory.store(),
            directory,
        }
    }

    /// Append a notification for `node` if its status differs from
    /// `previous_status`. Returns the new entry, if any.
    pub fn record(
        &self,
        owner_id: &str,
        node: &Node,
        previous_status: NodeStatus,
    ) -> Result<Option<Notification>> {
        if node.status == previous_status {
            return Ok(None);
        }

        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            node_id: node.id.clone(),
            node_name: node.peer_name.clone(),
            message: format!("Node status changed to {}", node.status.label()),
            read: false,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        let mut all = self.load()?;
        all.insert(0, notification.clone());
        self.save(&all)?;
        self.directory.add_notification_to_user(owner_id, &notification.id)?;

        info!(
            "{}: {} -> {}",
            node.peer_name,
            previous_status.label(),
            node.status.label()
        );
        Ok(Some(notification))
    }

    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let owned = self.directory.get_user_notification_ids(user_id)?;
        Ok(self
            .load()?
            .into_iter()
            .filter(|n| owned.contains(&n.id))
            .collect())
    }

    pub fn unread_count(&self, user_id: &str) -> Result<usize> {
        Ok(self.list_for_user(user_id)?.iter().filter(|n| !n.read).count())
    }

    /// Returns false if no notification has that id.
    pub fn mark_read(&self, notification_id: &str) -> Result<bool> {
        let mut all = self.load()?;
        let Some(entry) = all.iter_mut().find(|n| n.id == notification_id) else {
            return Ok(false);
        };
        if !entry.read {
            entry.read = true;
            self.save(&all)?;
        }
        Ok(true)
    }

    pub fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        let owned = self.directory.get_user_notification_ids(user_id)?;
        let mut all = self.load()?;

        let mut marked = 0;
        for entry in all.iter_mut().filter(|n| !n.read && owned.contains(&n.id)) {
            entry.read = true;
            marked += 1;
        }
        if marked > 0 {
            self.save(&all)?;
        }
        Ok(marked)
    }

    /// Drop every notification the user owns.
    pub fn clear(&self, user_id: &str) -> Result<usize> {
        let owned = self.directory.get_user_notification_ids(user_id)?;
        let mut all = self.load()?;

        let before = all.len();
        all.retain(|n| !owned.contains(&n.id));
        let removed = before - all.len();

        self.save(&all)?;
        if !owned.is_empty() {
            self.directory.clear_notifications_of_user(user_id)?;
        }

        debug!("Cleared {} notifications for user {}", removed, user_id);
        Ok(removed)
    }

    fn load(&self) -> Result<Vec<Notification>> {
        Ok(load_json(self.store.as_ref(), NOTIFICATIONS_KEY)?.unwrap_or_default())
    }

    fn save(&self, notifications: &[Notification]) -> Result<()> {
        save_json(self.store.as_ref(), NOTIFICATIONS_KEY, notifications)?;
        Ok(())
    }
}
