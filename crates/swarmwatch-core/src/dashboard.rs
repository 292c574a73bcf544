use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use swarmwatch_db::KeyValueStore;
use swarmwatch_types::models::{DashboardStats, Node, NodeStatus, Notification, User};

use crate::directory::UserDirectory;
use crate::error::Result;
use crate::gateway::PeerGateway;
use crate::notifications::NotificationLog;
use crate::reconcile::{reconcile, reconcile_failed};
use crate::registry::{NodeRegistry, filter_by_status};
use crate::session::{Session, SessionManager};

/// Outcome of one refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub stats: DashboardStats,
    pub nodes: Vec<Node>,
    /// Notifications recorded for status transitions during this cycle.
    pub notifications: Vec<Notification>,
    /// Ids of nodes whose fetch failed and kept their previous state.
    pub failed: Vec<String>,
}

/// Entry point for a rendering layer: one instance per open dashboard.
///
/// Everything except registration, login and statistics requires an
/// active session and fails with `NotAuthenticated` otherwise.
pub struct Dashboard<G> {
    directory: UserDirectory,
    sessions: SessionManager,
    registry: NodeRegistry,
    notifications: NotificationLog,
    gateway: G,
}

impl<G: PeerGateway> Dashboard<G> {
    pub fn new(store: Arc<dyn KeyValueStore>, gateway: G) -> Self {
        Self::from_directory(UserDirectory::new(store), gateway)
    }

    pub fn from_directory(directory: UserDirectory, gateway: G) -> Self {
        Self {
            sessions: SessionManager::new(directory.clone()),
            registry: NodeRegistry::new(directory.clone()),
            notifications: NotificationLog::new(directory.clone()),
            directory,
            gateway,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // -- Auth --

    /// Create the account and log straight into it.
    pub fn register(&mut self, username: &str, email: &str, password: &str) -> Result<&User> {
        let user = self.directory.register(username, email, password)?;
        self.sessions.login(&user.email, password)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<&User> {
        self.sessions.login(email, password)
    }

    pub fn logout(&mut self) -> Result<()> {
        self.sessions.logout()
    }

    pub fn restore(&mut self) -> Result<Option<&User>> {
        self.sessions.restore()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.sessions.current_user()
    }

    pub fn session(&self) -> Option<&Session> {
        self.sessions.session()
    }

    // -- Nodes --

    pub fn nodes(&self) -> Result<&[Node]> {
        Ok(self.sessions.require()?.nodes())
    }

    pub fn nodes_with_status(&self, status: Option<NodeStatus>) -> Result<Vec<&Node>> {
        Ok(filter_by_status(self.sessions.require()?.nodes(), status))
    }

    pub async fn add_node(&mut self, peer_name: &str) -> Result<Node> {
        let user_id = self.user_id()?;
        let node = self.registry.add_node(&self.gateway, &user_id, peer_name).await?;
        self.sessions.reload()?;
        Ok(node)
    }

    pub fn remove_node(&mut self, node_id: &str) -> Result<bool> {
        let user_id = self.user_id()?;
        let removed = self.registry.remove_node(&user_id, node_id)?;
        self.sessions.reload()?;
        Ok(removed)
    }

    // -- Refresh --

    /// Current swarm statistics, or the fallback values if the gateway fails.
    pub async fn stats(&self) -> DashboardStats {
        match self.gateway.fetch_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Dashboard stats unavailable, using fallback: {}", e);
                DashboardStats::fallback()
            }
        }
    }

    /// Re-fetch every tracked node concurrently, reconcile, commit the whole
    /// list once, then record a notification per status change.
    pub async fn refresh(&mut self) -> Result<RefreshReport> {
        let user_id = self.user_id()?;
        let stats = self.stats().await;
        let previous = self.registry.list_nodes(&user_id)?;

        debug!("Refreshing {} nodes for user {}", previous.len(), user_id);
        let results = join_all(
            previous
                .iter()
                .map(|node| self.gateway.fetch_peer(&node.peer_name)),
        )
        .await;

        let now = chrono::Utc::now().timestamp_millis();
        let mut nodes = Vec::with_capacity(previous.len());
        let mut failed = Vec::new();
        for (node, result) in previous.iter().zip(results) {
            match result {
                Ok(snapshot) => nodes.push(reconcile(node, &snapshot, now)),
                Err(e) => {
                    warn!("Refresh of {} failed, keeping last state: {}", node.peer_name, e);
                    failed.push(node.id.clone());
                    nodes.push(reconcile_failed(node, now));
                }
            }
        }

        self.registry.save_nodes(&user_id, &nodes)?;

        let mut recorded = Vec::new();
        for (before, after) in previous.iter().zip(&nodes) {
            if let Some(notification) = self.notifications.record(&user_id, after, before.status)? {
                recorded.push(notification);
            }
        }

        self.sessions.reload()?;
        info!(
            "Refreshed {} nodes ({} failed, {} status changes)",
            nodes.len(),
            failed.len(),
            recorded.len()
        );

        Ok(RefreshReport {
            stats,
            nodes,
            notifications: recorded,
            failed,
        })
    }

    // -- Notifications --

    pub fn notifications(&self) -> Result<&[Notification]> {
        Ok(self.sessions.require()?.notifications())
    }

    pub fn unread_count(&self) -> Result<usize> {
        Ok(self.sessions.require()?.unread_count())
    }

    /// Returns false if the notification does not belong to the current user.
    pub fn mark_notification_read(&mut self, notification_id: &str) -> Result<bool> {
        let session = self.sessions.require()?;
        if !session.user().owns_notification(notification_id) {
            return Ok(false);
        }
        let marked = self.notifications.mark_read(notification_id)?;
        self.sessions.reload()?;
        Ok(marked)
    }

    pub fn mark_all_notifications_read(&mut self) -> Result<usize> {
        let user_id = self.user_id()?;
        let marked = self.notifications.mark_all_read(&user_id)?;
        self.sessions.reload()?;
        Ok(marked)
    }

    pub fn clear_notifications(&mut self) -> Result<usize> {
        let user_id = self.user_id()?;
        let removed = self.notifications.clear(&user_id)?;
        self.sessions.reload()?;
        Ok(removed)
    }

    fn user_id(&self) -> Result<String> {
        Ok(self.sessions.require()?.user().id.clone())
    }
}
