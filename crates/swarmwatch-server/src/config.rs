use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_UPSTREAM_URL: &str = "https://dashboard.gensyn.ai/api/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    /// When set, only these (uppercase) peer names are served.
    pub peer_allowlist: Option<HashSet<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SWARMWATCH_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("SWARMWATCH_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("SWARMWATCH_PORT must be a port number")?;
        let upstream_url =
            std::env::var("SWARMWATCH_UPSTREAM_URL").unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.into());
        let timeout_secs: u64 = std::env::var("SWARMWATCH_UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let peer_allowlist = std::env::var("SWARMWATCH_PEER_ALLOWLIST")
            .ok()
            .and_then(|v| parse_allowlist(&v));

        Ok(Self {
            host,
            port,
            upstream_url,
            upstream_timeout: Duration::from_secs(timeout_secs),
            peer_allowlist,
        })
    }
}

/// Comma-separated peer names. An empty list means no restriction.
pub fn parse_allowlist(raw: &str) -> Option<HashSet<String>> {
    let names: HashSet<String> = raw
        .split(',')
        .map(|name| name.trim().to_uppercase())
        .filter(|name| !name.is_empty())
        .collect();
    (!names.is_empty()).then_some(names)
}
