//! Access token, refresh token, and gateway ticket management.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::identity::Identity;
use crate::db::kv::KeyValueStore;
use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Opaque token generation
// ---------------------------------------------------------------------------

/// Generate an opaque random token with the given prefix.
pub fn generate_opaque_token(prefix: &str, bytes: usize) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(&mut buf[..]);
    format!("{}_{}", prefix, URL_SAFE_NO_PAD.encode(&buf))
}

/// What every token resolves to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub username: String,
}

impl From<&Identity> for TokenData {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
        }
    }
}

impl From<TokenData> for Identity {
    fn from(data: TokenData) -> Self {
        Self {
            user_id: data.user_id,
            username: data.username,
        }
    }
}

async fn store(
    kv: &dyn KeyValueStore,
    key: &str,
    data: &TokenData,
    ttl_secs: u64,
) -> Result<(), ApiError> {
    let value = serde_json::to_string(data).map_err(|_| ApiError::internal("serialization"))?;
    kv.set_ex(key, &value, ttl_secs).await
}

fn decode<T: DeserializeOwned>(raw: Option<String>) -> Result<Option<T>, ApiError> {
    raw.map(|v| serde_json::from_str(&v).map_err(|_| ApiError::internal("corrupt token data")))
        .transpose()
}

// ---------------------------------------------------------------------------
// Access token — 1-hour TTL
// ---------------------------------------------------------------------------

pub const ACCESS_TTL_SECS: u64 = 3600;

pub fn generate_access_token() -> String {
    generate_opaque_token("sat", 32)
}

pub async fn store_access_token(
    kv: &dyn KeyValueStore,
    token: &str,
    data: &TokenData,
) -> Result<(), ApiError> {
    store(kv, &format!("social:sat:{token}"), data, ACCESS_TTL_SECS).await
}

pub async fn lookup_access_token(
    kv: &dyn KeyValueStore,
    token: &str,
) -> Result<Option<TokenData>, ApiError> {
    decode(kv.get(&format!("social:sat:{token}")).await?)
}

// ---------------------------------------------------------------------------
// Refresh token — 30-day TTL, rotated on use
// ---------------------------------------------------------------------------

pub const REFRESH_TTL_SECS: u64 = 30 * 24 * 3600;

pub fn generate_refresh_token() -> String {
    generate_opaque_token("srt", 32)
}

pub async fn store_refresh_token(
    kv: &dyn KeyValueStore,
    token: &str,
    data: &TokenData,
) -> Result<(), ApiError> {
    store(kv, &format!("social:srt:{token}"), data, REFRESH_TTL_SECS).await
}

pub async fn consume_refresh_token(
    kv: &dyn KeyValueStore,
    token: &str,
) -> Result<Option<TokenData>, ApiError> {
    decode(kv.take(&format!("social:srt:{token}")).await?)
}

// ---------------------------------------------------------------------------
// Gateway ticket — 30-second TTL, single-use
// ---------------------------------------------------------------------------

pub const WS_TICKET_TTL_SECS: u64 = 30;

pub fn generate_ws_ticket() -> String {
    generate_opaque_token("wst", 32)
}

pub async fn store_ws_ticket(
    kv: &dyn KeyValueStore,
    ticket: &str,
    data: &TokenData,
) -> Result<(), ApiError> {
    store(kv, &format!("social:wst:{ticket}"), data, WS_TICKET_TTL_SECS).await
}

/// Resolve and invalidate a gateway ticket.
pub async fn consume_ws_ticket(
    kv: &dyn KeyValueStore,
    ticket: &str,
) -> Result<Option<TokenData>, ApiError> {
    decode(kv.take(&format!("social:wst:{ticket}")).await?)
}

/// Mint and store a fresh gateway ticket for `data`.
pub async fn issue_ws_ticket(kv: &dyn KeyValueStore, data: &TokenData) -> Result<String, ApiError> {
    let ticket = generate_ws_ticket();
    store_ws_ticket(kv, &ticket, data).await?;
    Ok(ticket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::kv::MemoryStore;

    fn data() -> TokenData {
        TokenData {
            user_id: "usr_1".into(),
            username: "alice".into(),
        }
    }

    #[test]
    fn opaque_tokens_are_prefixed_and_unique() {
        let a = generate_ws_ticket();
        let b = generate_ws_ticket();
        assert!(a.starts_with("wst_"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn ws_ticket_is_single_use() {
        let kv = MemoryStore::new();
        let ticket = issue_ws_ticket(&kv, &data()).await.unwrap();

        let first = consume_ws_ticket(&kv, &ticket).await.unwrap().unwrap();
        assert_eq!(first.user_id, "usr_1");
        assert!(consume_ws_ticket(&kv, &ticket).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn access_token_lookup_is_repeatable() {
        let kv = MemoryStore::new();
        let token = generate_access_token();
        store_access_token(&kv, &token, &data()).await.unwrap();

        assert!(lookup_access_token(&kv, &token).await.unwrap().is_some());
        assert!(lookup_access_token(&kv, &token).await.unwrap().is_some());
        assert!(lookup_access_token(&kv, "sat_bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_token_data_is_an_internal_error() {
        let kv = MemoryStore::new();
        kv.set_ex("social:sat:bad", "{not json", 60).await.unwrap();
        let err = lookup_access_token(&kv, "bad").await.unwrap_err();
        assert_eq!(err.code, "INTERNAL_ERROR");
    }
}
