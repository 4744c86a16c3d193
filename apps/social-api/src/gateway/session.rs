//! Per-connection gateway session state.

use std::sync::atomic::{AtomicU64, Ordering};

use social_common::id::{prefix, prefixed_ulid};

use crate::auth::identity::Identity;

/// State for a single bound WebSocket connection.
pub struct GatewaySession {
    /// Unique session identifier (`gw_` prefixed ULID).
    pub session_id: String,
    pub user_id: String,
    /// Cached at IDENTIFY time.
    pub username: String,
    /// Monotonically increasing sequence number for dispatch events.
    seq: AtomicU64,
}

impl GatewaySession {
    pub fn new(identity: Identity) -> Self {
        Self {
            session_id: prefixed_ulid(prefix::GATEWAY_SESSION),
            user_id: identity.user_id,
            username: identity.username,
            seq: AtomicU64::new(0),
        }
    }

    /// Get the next sequence number for a dispatch event.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_starts_at_one_and_increments() {
        let session = GatewaySession::new(Identity {
            user_id: "usr_1".into(),
            username: "alice".into(),
        });
        assert!(session.session_id.starts_with("gw_"));
        assert_eq!(session.next_seq(), 1);
        assert_eq!(session.next_seq(), 2);
    }
}
