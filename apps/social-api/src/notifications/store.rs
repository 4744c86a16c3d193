//! Notification store contract and the in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use social_common::SnowflakeGenerator;

use crate::models::notification::{
    Notification, NotificationDraft, NotificationFilter, NotificationPage,
};

use super::NotificationError;

/// Durable storage for notifications.
///
/// Listings are newest first: `created_at` descending, and among equal
/// timestamps the later insert comes first.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a draft and return it with its assigned id.
    async fn create(&self, draft: NotificationDraft) -> Result<Notification, NotificationError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>, NotificationError>;

    async fn list_for_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
        filter: NotificationFilter,
    ) -> Result<NotificationPage, NotificationError>;

    async fn count_unread(&self, user_id: &str) -> Result<i64, NotificationError>;

    /// Set `read = true`. Marking an already-read notification succeeds.
    async fn mark_read(&self, id: i64) -> Result<Notification, NotificationError>;

    /// Mark every unread notification of `user_id` read. Returns how many changed.
    async fn mark_all_read(&self, user_id: &str) -> Result<u64, NotificationError>;

    async fn delete_all_for_user(&self, user_id: &str) -> Result<u64, NotificationError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Process-local store. Used when no database is configured and in tests.
pub struct MemoryNotificationStore {
    rows: Mutex<Vec<Notification>>,
    snowflake: Arc<SnowflakeGenerator>,
}

impl MemoryNotificationStore {
    pub fn new(snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            snowflake,
        }
    }

    /// Total number of stored rows across all recipients.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, draft: NotificationDraft) -> Result<Notification, NotificationError> {
        let mut rows = self.rows.lock();
        // Id is taken under the lock so id order matches insertion order.
        let notification = draft.into_notification(self.snowflake.generate());
        rows.push(notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>, NotificationError> {
        Ok(self.rows.lock().iter().find(|n| n.id == id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
        filter: NotificationFilter,
    ) -> Result<NotificationPage, NotificationError> {
        let mut matching: Vec<Notification> = self
            .rows
            .lock()
            .iter()
            .filter(|n| n.user_id == user_id)
            .filter(|n| filter == NotificationFilter::All || !n.read)
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total_count = matching.len() as i64;
        let offset = offset.max(0);
        let notifications: Vec<Notification> = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit.max(0) as usize)
            .collect();
        let has_more = offset + (notifications.len() as i64) < total_count;

        Ok(NotificationPage {
            notifications,
            has_more,
            total_count,
        })
    }

    async fn count_unread(&self, user_id: &str) -> Result<i64, NotificationError> {
        let rows = self.rows.lock();
        Ok(rows.iter().filter(|n| n.user_id == user_id && !n.read).count() as i64)
    }

    async fn mark_read(&self, id: i64) -> Result<Notification, NotificationError> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(NotificationError::NotFound)?;
        row.read = true;
        Ok(row.clone())
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64, NotificationError> {
        let mut changed = 0;
        for row in self.rows.lock().iter_mut() {
            if row.user_id == user_id && !row.read {
                row.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_all_for_user(&self, user_id: &str) -> Result<u64, NotificationError> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|n| n.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }
}
