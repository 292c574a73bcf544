use serde::{Deserialize, Serialize};

// -- Proxy requests --

#[derive(Debug, Deserialize)]
pub struct PeerQuery {
    pub name: Option<String>,
}

// -- Proxy responses --

/// Body of `GET /api/peer`. A superset of `PeerSnapshot`, so gateway
/// clients can decode it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerResponse {
    pub peer_name: String,
    pub peer_id: Option<String>,
    pub reward: f64,
    pub score: u64,
    pub online: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

// -- Upstream swarm API --

/// Body of the upstream `/round-stage` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoundStage {
    #[serde(default)]
    pub round: Option<u64>,
    #[serde(default)]
    pub stage: Option<u64>,
}
