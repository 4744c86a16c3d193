//! Handle to one live gateway connection.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use social_common::id::{prefix, prefixed_ulid};
use tokio::sync::{mpsc, Notify};

/// An event queued for delivery on a connection.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub name: &'static str,
    pub data: Value,
}

/// Why a push did not reach the connection's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    #[error("connection closed")]
    Closed,
    #[error("connection did not accept the event in time")]
    TimedOut,
}

/// Why a connection's event loop was asked to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// A newer connection for the same user took over the binding.
    Superseded,
    /// A push failed and the binding was evicted from the registry.
    Evicted,
}

/// Cloneable sending side of a gateway connection.
///
/// The connection's event loop owns the matching receiver; once the loop
/// exits every push through a stale clone fails with [`DeliveryFailure::Closed`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: String,
    user_id: String,
    sender: mpsc::Sender<OutboundEvent>,
    shutdown: Arc<Notify>,
    close_reason: Arc<Mutex<Option<CloseReason>>>,
}

impl ConnectionHandle {
    /// Create a handle for `user_id` with an outbound queue of `buffer` events.
    pub fn new(user_id: impl Into<String>, buffer: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: prefixed_ulid(prefix::CONNECTION),
            user_id: user_id.into(),
            sender,
            shutdown: Arc::new(Notify::new()),
            close_reason: Arc::new(Mutex::new(None)),
        };
        (handle, receiver)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// True once the connection's event loop has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queue an event, waiting at most `timeout` for room in the queue.
    pub async fn push(
        &self,
        name: &'static str,
        data: Value,
        timeout: Duration,
    ) -> Result<(), DeliveryFailure> {
        match tokio::time::timeout(timeout, self.sender.send(OutboundEvent { name, data })).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DeliveryFailure::Closed),
            Err(_) => Err(DeliveryFailure::TimedOut),
        }
    }

    /// Ask the connection's event loop to close. The first reason given wins.
    pub fn request_close(&self, reason: CloseReason) {
        {
            let mut slot = self.close_reason.lock();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.shutdown.notify_one();
    }

    /// Resolves once [`request_close`](Self::request_close) has been called.
    pub async fn close_requested(&self) -> CloseReason {
        self.shutdown.notified().await;
        let reason = *self.close_reason.lock();
        reason.unwrap_or(CloseReason::Evicted)
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}
