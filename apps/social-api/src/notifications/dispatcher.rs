//! Notification dispatcher: the one path that both persists and delivers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::gateway::connection::CloseReason;
use crate::gateway::events::EventName;
use crate::gateway::registry::SessionRegistry;
use crate::models::notification::{
    Notification, NotificationDraft, NotificationFilter, NotificationPage, NotificationType,
};

use super::store::NotificationStore;
use super::NotificationError;

/// Upper bound on the unread list returned in one call.
pub const MAX_UNREAD_FETCH: i64 = 200;

/// Largest page size accepted by [`NotificationDispatcher::page`].
pub const MAX_PAGE_SIZE: u32 = 100;

/// Result of a real-time push attempt. Never surfaced to producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Queued on the recipient's live connection.
    Delivered,
    /// Recipient has no live connection; the stored record is the fallback.
    Skipped,
    /// The connection was dead or stuck; its binding has been evicted.
    Failed,
}

pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    sessions: Arc<SessionRegistry>,
    store_timeout: Duration,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        sessions: Arc<SessionRegistry>,
        store_timeout: Duration,
        send_timeout: Duration,
    ) -> Self {
        Self {
            store,
            sessions,
            store_timeout,
            send_timeout,
        }
    }

    /// Record that `actor_id` did something to `recipient_id` and push it
    /// to the recipient if they are connected.
    ///
    /// Returns `Ok(None)` for self-notifications, which are never stored.
    /// The persisted record is returned whatever the delivery outcome.
    pub async fn notify(
        &self,
        recipient_id: &str,
        actor_id: &str,
        actor_name: &str,
        type_: NotificationType,
        reference_id: &str,
        content: &str,
    ) -> Result<Option<Notification>, NotificationError> {
        if recipient_id == actor_id {
            tracing::trace!(user_id = %recipient_id, %type_, "self-notification suppressed");
            return Ok(None);
        }

        let draft = NotificationDraft {
            user_id: recipient_id.to_string(),
            actor_id: actor_id.to_string(),
            actor_name: actor_name.to_string(),
            type_,
            reference_id: reference_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let notification = self.bounded(self.store.create(draft)).await?;

        let outcome = self
            .push(recipient_id, EventName::NOTIFICATION_CREATE, &notification)
            .await;
        tracing::debug!(
            notification_id = notification.id,
            user_id = %recipient_id,
            %type_,
            ?outcome,
            "notification dispatched"
        );

        Ok(Some(notification))
    }

    /// Push `payload` to `user_id`'s live connection, if any.
    ///
    /// A dead or stuck connection is evicted from the registry and told to
    /// close so its client reconnects; nothing is retried.
    pub async fn push<T: serde::Serialize>(
        &self,
        user_id: &str,
        event: &'static str,
        payload: &T,
    ) -> DeliveryOutcome {
        let Some(handle) = self.sessions.lookup(user_id) else {
            return DeliveryOutcome::Skipped;
        };

        let data = match serde_json::to_value(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, event, "failed to serialize push payload");
                return DeliveryOutcome::Failed;
            }
        };

        if handle.is_closed() {
            self.sessions.remove_by_connection(handle.id());
            handle.request_close(CloseReason::Evicted);
            tracing::debug!(conn_id = %handle.id(), %user_id, "evicted closed connection");
            return DeliveryOutcome::Failed;
        }

        match handle.push(event, data, self.send_timeout).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(failure) => {
                self.sessions.remove_by_connection(handle.id());
                handle.request_close(CloseReason::Evicted);
                tracing::warn!(
                    conn_id = %handle.id(),
                    %user_id,
                    event,
                    %failure,
                    "push failed, connection evicted"
                );
                DeliveryOutcome::Failed
            }
        }
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Page `page` (zero-based) of `size` notifications, newest first.
    pub async fn page(
        &self,
        user_id: &str,
        page: u32,
        size: u32,
        filter: NotificationFilter,
    ) -> Result<NotificationPage, NotificationError> {
        let size = size.clamp(1, MAX_PAGE_SIZE) as i64;
        let offset = page as i64 * size;
        self.bounded(self.store.list_for_user(user_id, offset, size, filter))
            .await
    }

    pub async fn unread(&self, user_id: &str) -> Result<Vec<Notification>, NotificationError> {
        let page = self
            .bounded(self.store.list_for_user(
                user_id,
                0,
                MAX_UNREAD_FETCH,
                NotificationFilter::Unread,
            ))
            .await?;
        Ok(page.notifications)
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64, NotificationError> {
        self.bounded(self.store.count_unread(user_id)).await
    }

    /// Mark one notification read on behalf of `requesting_user_id`.
    pub async fn mark_read(
        &self,
        id: i64,
        requesting_user_id: &str,
    ) -> Result<Notification, NotificationError> {
        let existing = self
            .bounded(self.store.find_by_id(id))
            .await?
            .ok_or(NotificationError::NotFound)?;

        if existing.user_id != requesting_user_id {
            return Err(NotificationError::Unauthorized);
        }
        if existing.read {
            return Ok(existing);
        }

        let updated = self.bounded(self.store.mark_read(id)).await?;
        self.push(requesting_user_id, EventName::NOTIFICATION_UPDATE, &updated)
            .await;
        Ok(updated)
    }

    /// Mark every unread notification of `user_id` read. Returns how many changed.
    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64, NotificationError> {
        let changed = self.bounded(self.store.mark_all_read(user_id)).await?;
        if changed > 0 {
            self.push(
                user_id,
                EventName::NOTIFICATIONS_ALL_READ,
                &serde_json::json!({ "updated": changed }),
            )
            .await;
        }
        Ok(changed)
    }

    pub async fn delete_all(&self, user_id: &str) -> Result<u64, NotificationError> {
        let deleted = self.bounded(self.store.delete_all_for_user(user_id)).await?;
        tracing::info!(%user_id, deleted, "notifications cleared");
        Ok(deleted)
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, NotificationError>>,
    ) -> Result<T, NotificationError> {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Storage(format!(
                "store call exceeded {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }
}
