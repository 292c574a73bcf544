//! Stateless proxy in front of the external swarm API. Normalizes peer
//! lookups and aggregates the dashboard statistics.

pub mod config;
pub mod routes;
pub mod upstream;
