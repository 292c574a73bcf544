use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account. Persisted as one entry of the user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    /// Unique across the directory, compared exactly as stored.
    pub email: String,
    /// Argon2id PHC string, never the plaintext password.
    pub password_hash: String,
    #[serde(default)]
    pub node_ids: Vec<String>,
    #[serde(default)]
    pub notification_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn owns_node(&self, node_id: &str) -> bool {
        self.node_ids.iter().any(|id| id == node_id)
    }

    pub fn owns_notification(&self, notification_id: &str) -> bool {
        self.notification_ids.iter().any(|id| id == notification_id)
    }
}

/// Locally derived online/offline classification of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Active,
    Inactive,
    #[default]
    Unknown,
}

impl NodeStatus {
    /// Human-readable wording used in notifications and status columns.
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "running",
            Self::Inactive => "offline",
            Self::Unknown => "unknown",
        }
    }
}

/// A tracked peer of the swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// Display key, always uppercase.
    pub peer_name: String,
    pub peer_id: String,
    #[serde(default)]
    pub status: NodeStatus,
    pub reward: f64,
    /// Reported by the remote API as `score`.
    pub passed_rounds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reward: Option<f64>,
    /// Epoch milliseconds of the last refresh attempt.
    pub last_updated: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
}

/// A recorded status transition of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub node_id: String,
    pub node_name: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    /// Epoch milliseconds, set once at creation.
    pub timestamp: i64,
}

/// Aggregate swarm statistics shown at the top of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub nodes_connected: u64,
    pub models_trained: u64,
    pub round: u64,
    pub stage: u64,
}

impl DashboardStats {
    pub const FALLBACK_NODES_CONNECTED: u64 = 222;
    pub const FALLBACK_MODELS_TRAINED: u64 = 24596;
    pub const FALLBACK_ROUND: u64 = 431;
    pub const FALLBACK_STAGE: u64 = 2;

    /// Values shown when the remote API cannot be reached.
    pub fn fallback() -> Self {
        Self {
            nodes_connected: Self::FALLBACK_NODES_CONNECTED,
            models_trained: Self::FALLBACK_MODELS_TRAINED,
            round: Self::FALLBACK_ROUND,
            stage: Self::FALLBACK_STAGE,
        }
    }
}

/// Fields fetched for one peer. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSnapshot {
    #[serde(default)]
    pub peer_id: Option<String>,
    #[serde(default)]
    pub reward: Option<f64>,
    #[serde(default)]
    pub score: Option<u64>,
    #[serde(default)]
    pub online: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&NodeStatus::Inactive).unwrap();
        assert_eq!(json, "\"inactive\"");
        assert_eq!(NodeStatus::default(), NodeStatus::Unknown);
    }

    #[test]
    fn status_labels() {
        assert_eq!(NodeStatus::Active.label(), "running");
        assert_eq!(NodeStatus::Inactive.label(), "offline");
        assert_eq!(NodeStatus::Unknown.label(), "unknown");
    }

    #[test]
    fn node_uses_camel_case_keys() {
        let node = Node {
            id: "n1".into(),
            peer_name: "GILDED REPTILIAN APE".into(),
            peer_id: "QmYCWG".into(),
            status: NodeStatus::Active,
            reward: 1300.86,
            passed_rounds: 242,
            last_reward: Some(1300.86),
            last_updated: 1_700_000_000_000,
            online: None,
        };

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["peerName"], "GILDED REPTILIAN APE");
        assert_eq!(value["passedRounds"], 242);
        assert_eq!(value["status"], "active");
        assert!(value.get("online").is_none());
    }

    #[test]
    fn peer_snapshot_tolerates_missing_fields() {
        let snapshot: PeerSnapshot = serde_json::from_str(r#"{"reward": 12.5}"#).unwrap();
        assert_eq!(snapshot.reward, Some(12.5));
        assert!(snapshot.peer_id.is_none());
        assert!(snapshot.score.is_none());
        assert!(snapshot.online.is_none());
    }
}
