use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use social_api::config::Config;
use social_api::db::kv::{KeyValueStore, MemoryStore};
use social_api::notifications::{MemoryNotificationStore, NotificationStore, PgNotificationStore};
use social_api::AppState;
use social_common::SnowflakeGenerator;

/// How often expired tokens are purged from the in-memory KV store.
const KV_PURGE_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;
    let snowflake = Arc::new(SnowflakeGenerator::new(0));

    let store: Arc<dyn NotificationStore> = match &config.database_url {
        Some(url) => match social_api::db::pool::connect(url) {
            Ok(db) => Arc::new(PgNotificationStore::new(db, snowflake)),
            Err(e) => {
                tracing::error!(error = %e, "failed to create database pool");
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("DATABASE_URL not set, notifications are kept in memory");
            Arc::new(MemoryNotificationStore::new(snowflake))
        }
    };

    let memory_kv = Arc::new(MemoryStore::new());
    spawn_kv_purge(memory_kv.clone());
    let kv: Arc<dyn KeyValueStore> = memory_kv;

    tracing::info!(
        store_timeout_ms = config.store_timeout.as_millis() as u64,
        send_timeout_ms = config.send_timeout.as_millis() as u64,
        close_superseded = config.close_superseded_sessions,
        "social-api configured"
    );

    let state = AppState::new(config, store, kv);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(social_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "social-api listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }
}

fn spawn_kv_purge(kv: Arc<MemoryStore>) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(KV_PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            kv.purge_expired();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
