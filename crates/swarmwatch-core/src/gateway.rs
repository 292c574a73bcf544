use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use swarmwatch_types::models::{DashboardStats, PeerSnapshot};

use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of remote peer data and swarm statistics.
pub trait PeerGateway: Send + Sync {
    /// Look up one peer by display name. Unknown peers yield `PeerNotFound`.
    fn fetch_peer(&self, peer_name: &str) -> impl Future<Output = Result<PeerSnapshot>> + Send;

    fn fetch_stats(&self) -> impl Future<Output = Result<DashboardStats>> + Send;
}

/// Gateway backed by the SwarmWatch proxy (or anything serving the same
/// `/peer` and `/dashboard-stats` routes).
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Gateway(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response> {
        debug!("GET {}", url);
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("Request failed: {}", e)))
    }
}

impl PeerGateway for HttpGateway {
    async fn fetch_peer(&self, peer_name: &str) -> Result<PeerSnapshot> {
        let url = Url::parse_with_params(&format!("{}/peer", self.base_url), &[("name", peer_name)])
            .map_err(|e| Error::Gateway(format!("Bad gateway URL: {}", e)))?;

        let resp = self.get(url).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::PeerNotFound(peer_name.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!("Peer lookup failed ({}): {}", status, body)));
        }

        resp.json::<PeerSnapshot>()
            .await
            .map_err(|e| Error::Gateway(format!("Malformed peer response: {}", e)))
    }

    async fn fetch_stats(&self) -> Result<DashboardStats> {
        let url = Url::parse(&format!("{}/dashboard-stats", self.base_url))
            .map_err(|e| Error::Gateway(format!("Bad gateway URL: {}", e)))?;

        let resp = self.get(url).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Gateway(format!("Stats request failed ({})", status)));
        }

        resp.json::<DashboardStats>()
            .await
            .map_err(|e| Error::Gateway(format!("Malformed stats response: {}", e)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted gateway: answers from a table, unknown names are 404s,
    /// names in `failing` are transport errors.
    #[derive(Default)]
    pub(crate) struct FakeGateway {
        pub peers: Mutex<HashMap<String, PeerSnapshot>>,
        pub failing: Mutex<Vec<String>>,
        pub stats: Mutex<Option<DashboardStats>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeGateway {
        pub fn with_peer(self, name: &str, snapshot: PeerSnapshot) -> Self {
            self.set_peer(name, snapshot);
            self
        }

        pub fn set_peer(&self, name: &str, snapshot: PeerSnapshot) {
            self.peers.lock().unwrap().insert(name.to_string(), snapshot);
        }

        pub fn fail(&self, name: &str) {
            self.failing.lock().unwrap().push(name.to_string());
        }
    }

    impl PeerGateway for FakeGateway {
        async fn fetch_peer(&self, peer_name: &str) -> Result<PeerSnapshot> {
            self.calls.lock().unwrap().push(peer_name.to_string());
            if self.failing.lock().unwrap().iter().any(|n| n == peer_name) {
                return Err(Error::Gateway("connection refused".into()));
            }
            self.peers
                .lock()
                .unwrap()
                .get(peer_name)
                .cloned()
                .ok_or_else(|| Error::PeerNotFound(peer_name.to_string()))
        }

        async fn fetch_stats(&self) -> Result<DashboardStats> {
            self.stats
                .lock()
                .unwrap()
                .ok_or_else(|| Error::Gateway("stats unavailable".into()))
        }
    }

    pub(crate) fn snapshot(peer_id: &str, reward: f64, score: u64) -> PeerSnapshot {
        PeerSnapshot {
            peer_id: Some(peer_id.to_string()),
            reward: Some(reward),
            score: Some(score),
            online: None,
        }
    }

    #[test]
    fn base_url_is_normalized() {
        let gateway = HttpGateway::new("http://localhost:3000/api/").unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:3000/api");
    }
}
