//! `upkeep-notify` — per-user notifications with SQLite persistence.
//!
//! Notifications are best-effort: callers create them after a primary write
//! succeeds and log (rather than propagate) any failure.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{NotifyError, Result};
pub use store::NotifyStore;
pub use types::{NewNotification, Notification, NotificationKind, RelatedKind};
