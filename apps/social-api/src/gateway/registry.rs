//! Registry of which users currently hold an open gateway connection.

use dashmap::DashMap;

use super::connection::ConnectionHandle;

/// Maps each user to at most one live connection.
///
/// Uses `DashMap` for shard-level concurrency. A second map indexes
/// connection id → user id so teardown, which only knows its own handle,
/// resolves in O(1).
pub struct SessionRegistry {
    by_user: DashMap<String, ConnectionHandle>,
    by_connection: DashMap<String, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            by_user: DashMap::new(),
            by_connection: DashMap::new(),
        }
    }

    /// Bind `user_id` to `handle`. The last registration wins; the handle it
    /// replaced, if any, is returned so the caller can decide what to do
    /// with it.
    pub fn register(&self, user_id: &str, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        self.by_connection
            .insert(handle.id().to_string(), user_id.to_string());
        let previous = self.by_user.insert(user_id.to_string(), handle);
        if let Some(prev) = &previous {
            self.by_connection.remove(prev.id());
        }
        previous
    }

    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.by_user.get(user_id).map(|entry| entry.value().clone())
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.by_user.contains_key(user_id)
    }

    /// Remove whatever binding references `connection_id`.
    ///
    /// No-op when the connection is unknown or was already superseded by a
    /// newer registration for the same user. Returns whether a binding was
    /// removed.
    pub fn remove_by_connection(&self, connection_id: &str) -> bool {
        let Some((_, user_id)) = self.by_connection.remove(connection_id) else {
            return false;
        };
        self.by_user
            .remove_if(&user_id, |_, current| current.id() == connection_id)
            .is_some()
    }

    /// Number of bound users.
    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
