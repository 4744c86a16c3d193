pub mod activity;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod notifications;
pub mod routes;

use std::sync::Arc;

use auth::identity::{IdentityProvider, JwtIdentityProvider};
use config::Config;
use db::kv::KeyValueStore;
use gateway::registry::SessionRegistry;
use notifications::{NotificationDispatcher, NotificationStore};

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KeyValueStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub notifications: Arc<NotificationDispatcher>,
}

impl AppState {
    /// Wire the registry and dispatcher around the given backends.
    pub fn new(
        config: Config,
        store: Arc<dyn NotificationStore>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        let identity = Arc::new(JwtIdentityProvider::new(
            &config.jwt_secret,
            config.jwt_issuer.as_deref(),
        ));
        Self::with_identity(config, store, kv, identity)
    }

    pub fn with_identity(
        config: Config,
        store: Arc<dyn NotificationStore>,
        kv: Arc<dyn KeyValueStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let notifications = Arc::new(NotificationDispatcher::new(
            store,
            sessions.clone(),
            config.store_timeout,
            config.send_timeout,
        ));
        Self {
            kv,
            identity,
            config: Arc::new(config),
            sessions,
            notifications,
        }
    }

    /// Feature-facing notification helpers bound to this state's dispatcher.
    pub fn activity(&self) -> activity::ActivityNotifier {
        activity::ActivityNotifier::new(self.notifications.clone())
    }
}
