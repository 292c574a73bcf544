//! Storage keys. Values are JSON.

pub const USERS_KEY: &str = "swarmwatch:users";
pub const SESSION_KEY: &str = "swarmwatch:session";
pub const NOTIFICATIONS_KEY: &str = "swarmwatch:notifications";

pub fn nodes_key(user_id: &str) -> String {
    format!("swarmwatch:nodes:{}", user_id)
}
