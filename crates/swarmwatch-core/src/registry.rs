use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use swarmwatch_db::{KeyValueStore, load_json, save_json};
use swarmwatch_types::models::{Node, NodeStatus};

use crate::directory::UserDirectory;
use crate::error::{Error, Result};
use crate::gateway::PeerGateway;
use crate::keys::nodes_key;

/// Tracked nodes, one persisted list per user.
#[derive(Clone)]
pub struct NodeRegistry {
    store: Arc<dyn KeyValueStore>,
    directory: UserDirectory,
}

impl NodeRegistry {
    pub fn new(directory: UserDirectory) -> Self {
        Self {
            store: directory.store(),
            directory,
        }
    }

    /// The user's nodes in insertion order, restricted to ids the user owns.
    pub fn list_nodes(&self, user_id: &str) -> Result<Vec<Node>> {
        let owned = self.directory.get_user_node_ids(user_id)?;
        Ok(self
            .load(user_id)?
            .into_iter()
            .filter(|node| owned.contains(&node.id))
            .collect())
    }

    /// Resolve `peer_name` through the gateway and start tracking it.
    pub async fn add_node<G: PeerGateway>(
        &self,
        gateway: &G,
        user_id: &str,
        peer_name: &str,
    ) -> Result<Node> {
        let peer_name = normalize_peer_name(peer_name);
        if peer_name.is_empty() {
            return Err(Error::Validation("peer name is required".into()));
        }
        if self.directory.find_by_id(user_id)?.is_none() {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        if self
            .list_nodes(user_id)?
            .iter()
            .any(|node| normalize_peer_name(&node.peer_name) == peer_name)
        {
            return Err(Error::DuplicateNode(peer_name));
        }

        debug!("Resolving peer {}", peer_name);
        let snapshot = gateway.fetch_peer(&peer_name).await?;

        let reward = snapshot.reward.unwrap_or(0.0);
        let peer_id = match snapshot.peer_id {
            Some(id) if !id.is_empty() => id,
            _ => format!("peer_{}", &Uuid::new_v4().simple().to_string()[..8]),
        };

        let node = Node {
            id: Uuid::new_v4().to_string(),
            peer_name,
            peer_id,
            status: NodeStatus::Unknown,
            reward,
            passed_rounds: snapshot.score.unwrap_or(0),
            last_reward: Some(reward),
            last_updated: chrono::Utc::now().timestamp_millis(),
            online: snapshot.online,
        };

        let mut nodes = self.load(user_id)?;
        nodes.push(node.clone());
        self.save_nodes(user_id, &nodes)?;
        self.directory.add_node_to_user(user_id, &node.id)?;

        info!("User {} now tracks {} ({})", user_id, node.peer_name, node.id);
        Ok(node)
    }

    /// Stop tracking a node. Returns false if the user had no such node.
    pub fn remove_node(&self, user_id: &str, node_id: &str) -> Result<bool> {
        let mut nodes = self.load(user_id)?;
        let before = nodes.len();
        nodes.retain(|node| node.id != node_id);
        let removed = nodes.len() != before;

        if removed {
            self.save_nodes(user_id, &nodes)?;
        }
        if self.directory.find_by_id(user_id)?.is_some() {
            self.directory.remove_node_from_user(user_id, node_id)?;
        }

        if removed {
            info!("User {} stopped tracking {}", user_id, node_id);
        }
        Ok(removed)
    }

    /// Overwrite the user's whole list.
    pub fn save_nodes(&self, user_id: &str, nodes: &[Node]) -> Result<()> {
        save_json(self.store.as_ref(), &nodes_key(user_id), nodes)?;
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<Vec<Node>> {
        Ok(load_json(self.store.as_ref(), &nodes_key(user_id))?.unwrap_or_default())
    }
}

/// Peer names compare case-insensitively and are displayed uppercase.
pub fn normalize_peer_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// `None` keeps every node.
pub fn filter_by_status(nodes: &[Node], status: Option<NodeStatus>) -> Vec<&Node> {
    nodes
        .iter()
        .filter(|node| status.is_none_or(|s| node.status == s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::fast_hasher;
    use crate::gateway::tests::{FakeGateway, snapshot};
    use swarmwatch_db::MemoryStore;

    fn setup() -> (NodeRegistry, String) {
        let directory = UserDirectory::new(Arc::new(MemoryStore::new())).with_hasher(fast_hasher());
        let user = directory.register("alice", "alice@example.com", "secret1").unwrap();
        (NodeRegistry::new(directory), user.id)
    }

    fn gateway() -> FakeGateway {
        FakeGateway::default()
            .with_peer("FOO", snapshot("QmFoo", 12.5, 3))
            .with_peer("BAR", snapshot("QmBar", 1.0, 1))
    }

    #[tokio::test]
    async fn add_node_builds_unknown_node() {
        let (registry, user) = setup();
        let node = registry.add_node(&gateway(), &user, "  foo ").await.unwrap();

        assert_eq!(node.peer_name, "FOO");
        assert_eq!(node.peer_id, "QmFoo");
        assert_eq!(node.status, NodeStatus::Unknown);
        assert_eq!(node.reward, 12.5);
        assert_eq!(node.last_reward, Some(12.5));
        assert_eq!(node.passed_rounds, 3);
        assert_eq!(registry.list_nodes(&user).unwrap(), vec![node]);
    }

    #[tokio::test]
    async fn duplicate_names_are_case_insensitive() {
        let (registry, user) = setup();
        let gateway = gateway();

        registry.add_node(&gateway, &user, "Foo").await.unwrap();
        let err = registry.add_node(&gateway, &user, "FOO").await.unwrap_err();

        assert!(matches!(err, Error::DuplicateNode(name) if name == "FOO"));
        assert_eq!(registry.list_nodes(&user).unwrap().len(), 1);
        // The duplicate never reached the gateway.
        assert_eq!(gateway.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_peer_is_not_added() {
        let (registry, user) = setup();
        let err = registry.add_node(&gateway(), &user, "nope").await.unwrap_err();

        assert!(matches!(err, Error::PeerNotFound(_)));
        assert!(registry.list_nodes(&user).unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_name_and_unknown_user_are_rejected() {
        let (registry, user) = setup();

        let blank = registry.add_node(&gateway(), &user, "   ").await.unwrap_err();
        assert!(matches!(blank, Error::Validation(_)));

        let nobody = registry.add_node(&gateway(), "nobody", "foo").await.unwrap_err();
        assert!(matches!(nobody, Error::UserNotFound(_)));
    }

    #[tokio::test]
    async fn list_preserves_insertion_order_and_remove() {
        let (registry, user) = setup();
        let gateway = gateway();
        let foo = registry.add_node(&gateway, &user, "foo").await.unwrap();
        let bar = registry.add_node(&gateway, &user, "bar").await.unwrap();

        let names: Vec<_> = registry.list_nodes(&user).unwrap().into_iter().map(|n| n.peer_name).collect();
        assert_eq!(names, vec!["FOO", "BAR"]);

        assert!(registry.remove_node(&user, &foo.id).unwrap());
        assert!(!registry.remove_node(&user, &foo.id).unwrap());
        assert_eq!(registry.list_nodes(&user).unwrap(), vec![bar]);
    }

    #[tokio::test]
    async fn lists_only_owned_ids() {
        let (registry, user) = setup();
        let foo = registry.add_node(&gateway(), &user, "foo").await.unwrap();

        // A node in the stored list that the user does not own is hidden.
        let mut stray = foo.clone();
        stray.id = "stray".into();
        registry.save_nodes(&user, &[foo.clone(), stray]).unwrap();

        assert_eq!(registry.list_nodes(&user).unwrap(), vec![foo]);
    }

    #[test]
    fn status_filter() {
        let base = Node {
            id: "a".into(),
            peer_name: "A".into(),
            peer_id: "Qa".into(),
            status: NodeStatus::Active,
            reward: 0.0,
            passed_rounds: 0,
            last_reward: None,
            last_updated: 0,
            online: None,
        };
        let offline = Node { id: "b".into(), status: NodeStatus::Inactive, ..base.clone() };
        let nodes = vec![base, offline];

        assert_eq!(filter_by_status(&nodes, None).len(), 2);
        let running = filter_by_status(&nodes, Some(NodeStatus::Active));
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, "a");
        assert!(filter_by_status(&nodes, Some(NodeStatus::Unknown)).is_empty());
    }
}
