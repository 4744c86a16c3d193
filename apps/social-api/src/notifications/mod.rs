//! Notification persistence and delivery.

pub mod dispatcher;
pub mod pg;
pub mod store;

pub use dispatcher::{DeliveryOutcome, NotificationDispatcher};
pub use pg::PgNotificationStore;
pub use store::{MemoryNotificationStore, NotificationStore};

use diesel_async::pooled_connection::deadpool::PoolError;

/// Failures surfaced by the notification store and dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification storage failed: {0}")]
    Storage(String),
    #[error("notification not found")]
    NotFound,
    #[error("notification belongs to another user")]
    Unauthorized,
}

impl From<diesel::result::Error> for NotificationError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<PoolError> for NotificationError {
    fn from(err: PoolError) -> Self {
        Self::Storage(err.to_string())
    }
}
