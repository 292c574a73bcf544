use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use swarmwatch_server::config::Config;
use swarmwatch_server::routes::{self, AppStateInner};
use swarmwatch_server::upstream::Upstream;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swarmwatch=debug,swarmwatch_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let upstream = Upstream::new(&config.upstream_url, config.upstream_timeout)?;
    if let Some(allowlist) = &config.peer_allowlist {
        info!("Peer allowlist active ({} names)", allowlist.len());
    }

    let state = Arc::new(AppStateInner {
        upstream,
        peer_allowlist: config.peer_allowlist.clone(),
    });
    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("SwarmWatch proxy listening on {}", addr);
    info!("Upstream: {}", config.upstream_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Cannot install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
