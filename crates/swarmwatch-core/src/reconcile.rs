//! Node status inference.
//!
//! The remote API does not always report whether a peer is online. When it
//! does not, the status is inferred from reward growth since the last
//! refresh: a growing reward means the peer is still training, a flat one
//! means it stopped. Both functions are pure; the caller supplies `now`.

use swarmwatch_types::models::{Node, NodeStatus, PeerSnapshot};

/// Fold freshly fetched remote fields into the previous snapshot of a node.
pub fn reconcile(previous: &Node, remote: &PeerSnapshot, now_ms: i64) -> Node {
    let new_reward = remote.reward.unwrap_or(0.0);

    let status = match (remote.online, previous.last_reward) {
        (Some(true), _) => NodeStatus::Active,
        (Some(false), _) => NodeStatus::Inactive,
        (None, Some(last)) if new_reward > last => NodeStatus::Active,
        (None, Some(last)) if new_reward == last => NodeStatus::Inactive,
        _ => NodeStatus::Unknown,
    };

    let peer_id = match remote.peer_id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => previous.peer_id.clone(),
    };

    Node {
        peer_id,
        status,
        reward: new_reward,
        passed_rounds: remote.score.unwrap_or(0),
        last_reward: Some(new_reward),
        last_updated: refreshed_at(previous, now_ms),
        ..previous.clone()
    }
}

/// Result of a refresh whose fetch failed: the last known state is kept and
/// only the refresh time moves.
pub fn reconcile_failed(previous: &Node, now_ms: i64) -> Node {
    Node {
        last_updated: refreshed_at(previous, now_ms),
        ..previous.clone()
    }
}

// lastUpdated never moves backwards, even if the clock does.
fn refreshed_at(previous: &Node, now_ms: i64) -> i64 {
    now_ms.max(previous.last_updated)
}
