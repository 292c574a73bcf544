//! SwarmWatch dashboard logic.
//!
//! Accounts, sessions, tracked nodes and their status notifications, all
//! persisted through an injected `KeyValueStore`. Remote peer data comes in
//! through a `PeerGateway`.

pub mod dashboard;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod notifications;
pub mod reconcile;
pub mod registry;
pub mod session;

pub use dashboard::{Dashboard, RefreshReport};
pub use directory::UserDirectory;
pub use error::{Error, Result};
pub use gateway::{HttpGateway, PeerGateway};
pub use notifications::NotificationLog;
pub use registry::NodeRegistry;
pub use session::{Session, SessionManager};
