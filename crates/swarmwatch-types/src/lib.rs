/// Shared data model for SwarmWatch.
///
/// `models` holds what the dashboard persists (users, nodes, notifications);
/// `api` holds the JSON shapes exchanged with the upstream proxy.

pub mod api;
pub mod models;
