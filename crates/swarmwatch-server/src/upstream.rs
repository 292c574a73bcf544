use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use swarmwatch_types::api::RoundStage;
use swarmwatch_types::models::{DashboardStats, PeerSnapshot};

pub enum PeerLookup {
    Found(PeerSnapshot),
    NotFound,
}

/// Client for the external swarm API.
#[derive(Clone)]
pub struct Upstream {
    client: Client,
    base_url: String,
}

impl Upstream {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Upstream names are lowercase.
    pub async fn peer(&self, peer_name: &str) -> Result<PeerLookup> {
        let url = Url::parse_with_params(
            &format!("{}/peer", self.base_url),
            &[("name", peer_name.to_lowercase())],
        )?;
        debug!("Upstream GET {}", url);

        let resp = self.client.get(url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(PeerLookup::NotFound);
        }
        if !resp.status().is_success() {
            return Err(anyhow!("Upstream peer lookup returned {}", resp.status()));
        }

        Ok(PeerLookup::Found(resp.json().await?))
    }

    /// Aggregate statistics. Any transport failure fails the whole call; a
    /// missing or zero value falls back field by field.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let (nodes_connected, models_trained, round_stage) = tokio::join!(
            self.get_json("nodes-connected"),
            self.get_json("unique-voters"),
            self.get_json("round-stage"),
        );
        let round_stage: RoundStage = serde_json::from_value(round_stage?).unwrap_or_default();

        Ok(DashboardStats {
            nodes_connected: parse_count(&nodes_connected?)
                .unwrap_or(DashboardStats::FALLBACK_NODES_CONNECTED),
            models_trained: parse_count(&models_trained?)
                .unwrap_or(DashboardStats::FALLBACK_MODELS_TRAINED),
            round: round_stage
                .round
                .filter(|r| *r > 0)
                .unwrap_or(DashboardStats::FALLBACK_ROUND),
            stage: round_stage
                .stage
                .filter(|s| *s > 0)
                .unwrap_or(DashboardStats::FALLBACK_STAGE),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Upstream GET {}", url);
        let resp = self.client.get(&url).send().await?;
        Ok(resp.json().await?)
    }
}

/// Counts arrive as JSON numbers or numeric strings; only the leading
/// integer part counts. Zero is treated as missing.
pub fn parse_count(value: &Value) -> Option<u64> {
    let count = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    };
    count.filter(|c| *c > 0)
}
