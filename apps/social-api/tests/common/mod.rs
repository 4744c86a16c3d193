#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use jsonwebtoken::{Algorithm, EncodingKey, Header};

use social_api::auth::identity::IdentityClaims;
use social_api::auth::tokens::{self, TokenData};
use social_api::config::Config;
use social_api::db::kv::{KeyValueStore, MemoryStore};
use social_api::db::{pool, run_migrations, test_database_url};
use social_api::models::notification::{Notification, NotificationType};
use social_api::notifications::{MemoryNotificationStore, PgNotificationStore};
use social_api::AppState;
use social_common::id::{prefix, prefixed_ulid};
use social_common::SnowflakeGenerator;

pub const TEST_JWT_SECRET: &str = "test-identity-secret";
pub const TEST_ISSUER: &str = "https://auth.social.test";

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_issuer: Some(TEST_ISSUER.to_string()),
        port: 0,
        store_timeout: Duration::from_secs(2),
        send_timeout: Duration::from_millis(500),
        outbound_buffer: 16,
        close_superseded_sessions: false,
    }
}

/// Build a test AppState backed by the in-memory stores.
pub fn test_state() -> AppState {
    test_state_with(test_config())
}

pub fn test_state_with(config: Config) -> AppState {
    let store = Arc::new(MemoryNotificationStore::new(Arc::new(SnowflakeGenerator::new(0))));
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    AppState::new(config, store, kv)
}

/// Build the full application router wired to a fresh test state.
pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = social_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Postgres store on the `<db>_test` database next to `DATABASE_URL`.
///
/// Returns `None` when no database is configured so the caller can skip.
/// Migrations run once per test binary.
pub fn pg_store() -> Option<PgNotificationStore> {
    static MIGRATED: OnceLock<Result<(), String>> = OnceLock::new();
    // One generator for every test in the binary so concurrent tests never mint the same id.
    static SNOWFLAKE: OnceLock<Arc<SnowflakeGenerator>> = OnceLock::new();

    let env_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(env_path);

    let database_url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.is_empty())?;
    let database_url = test_database_url(&database_url);

    let migrated = MIGRATED.get_or_init(|| {
        run_migrations(&database_url)
            .map(|_| ())
            .map_err(|e| e.to_string())
    });
    if let Err(e) = migrated {
        panic!("failed to migrate {database_url}: {e}");
    }

    let db = pool::connect(&database_url).expect("build test pool");
    let snowflake = SNOWFLAKE
        .get_or_init(|| Arc::new(SnowflakeGenerator::new(1)))
        .clone();
    Some(PgNotificationStore::new(db, snowflake))
}

pub fn new_user_id() -> String {
    prefixed_ulid(prefix::USER)
}

/// Mint an identity token the way the auth service would.
pub fn mint_identity_token(user_id: &str, username: &str) -> String {
    mint_identity_token_with(user_id, username, Some(TEST_ISSUER), 300)
}

pub fn mint_identity_token_with(
    user_id: &str,
    username: &str,
    issuer: Option<&str>,
    expires_in_secs: i64,
) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = IdentityClaims {
        sub: user_id.to_string(),
        username: Some(username.to_string()),
        iat: now,
        exp: now + expires_in_secs,
        iss: issuer.map(str::to_string),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("mint identity token")
}

fn token_data(user_id: &str, username: &str) -> TokenData {
    TokenData {
        user_id: user_id.to_string(),
        username: username.to_string(),
    }
}

/// Store an access token for `user_id` directly, skipping the login route.
pub async fn access_token_for(state: &AppState, user_id: &str, username: &str) -> String {
    let token = tokens::generate_access_token();
    tokens::store_access_token(state.kv.as_ref(), &token, &token_data(user_id, username))
        .await
        .expect("store access token");
    token
}

/// Issue a single-use gateway ticket for `user_id`.
pub async fn ws_ticket_for(state: &AppState, user_id: &str, username: &str) -> String {
    tokens::issue_ws_ticket(state.kv.as_ref(), &token_data(user_id, username))
        .await
        .expect("issue ws ticket")
}

/// Record a LIKE from `actor_id` to `recipient_id`.
pub async fn seed_like(
    state: &AppState,
    recipient_id: &str,
    actor_id: &str,
    post_id: &str,
) -> Notification {
    state
        .notifications
        .notify(
            recipient_id,
            actor_id,
            "actor",
            NotificationType::Like,
            post_id,
            "actor liked your post",
        )
        .await
        .expect("notify")
        .expect("not a self-notification")
}
