use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use swarmwatch_types::api::{ErrorResponse, PeerQuery, PeerResponse};
use swarmwatch_types::models::DashboardStats;

use crate::upstream::{PeerLookup, Upstream};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub upstream: Upstream,
    pub peer_allowlist: Option<HashSet<String>>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/peer", get(peer))
        .route("/dashboard-stats", get(dashboard_stats))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

pub async fn peer(State(state): State<AppState>, Query(query): Query<PeerQuery>) -> Response {
    let Some(raw_name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Peer name is required");
    };
    let peer_name = raw_name.to_uppercase();

    if let Some(allowlist) = &state.peer_allowlist {
        if !allowlist.contains(&peer_name) {
            debug!("Peer {} is not on the allowlist", peer_name);
            return error_response(StatusCode::NOT_FOUND, "Invalid node name");
        }
    }

    match state.upstream.peer(&peer_name).await {
        Ok(PeerLookup::Found(snapshot)) => Json(PeerResponse {
            peer_name,
            peer_id: snapshot.peer_id.filter(|id| !id.is_empty()),
            reward: snapshot.reward.unwrap_or(0.0),
            score: snapshot.score.unwrap_or(0),
            online: snapshot.online,
        })
        .into_response(),
        Ok(PeerLookup::NotFound) => error_response(StatusCode::NOT_FOUND, "Node not found"),
        Err(e) => {
            error!("Failed to fetch peer data for {}: {}", peer_name, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch node data")
        }
    }
}

/// Always answers; falls back to fixed values when upstream is unavailable.
pub async fn dashboard_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    match state.upstream.dashboard_stats().await {
        Ok(stats) => Json(stats),
        Err(e) => {
            warn!("Failed to fetch dashboard stats: {}", e);
            Json(DashboardStats::fallback())
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}
