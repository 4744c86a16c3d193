//! Identity tokens issued by the upstream auth service.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

/// Validates a bearer credential and yields the caller's identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn validate_and_extract_identity(&self, credential: &str) -> Result<Identity, ApiError>;
}

/// Claims carried by an identity token.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    #[serde(default)]
    pub username: Option<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// HS256 identity tokens signed with a secret shared with the auth service.
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn validate_and_extract_identity(&self, credential: &str) -> Result<Identity, ApiError> {
        let data = jsonwebtoken::decode::<IdentityClaims>(credential, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!(?e, "identity token validation failed");
                ApiError::unauthorized("Invalid or expired identity token")
            })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(ApiError::unauthorized("Identity token has no subject"));
        }

        Ok(Identity {
            username: claims.username.unwrap_or_else(|| claims.sub.clone()),
            user_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;

    const SECRET: &str = "test-secret";

    fn mint(sub: &str, iss: Option<&str>, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = IdentityClaims {
            sub: sub.to_string(),
            username: Some("alice".to_string()),
            iat: now,
            exp: now + exp_offset,
            iss: iss.map(str::to_string),
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let provider = JwtIdentityProvider::new(SECRET, None);
        let identity = provider
            .validate_and_extract_identity(&mint("usr_1", None, 300))
            .await
            .unwrap();
        assert_eq!(identity.user_id, "usr_1");
        assert_eq!(identity.username, "alice");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let provider = JwtIdentityProvider::new(SECRET, None);
        let err = provider
            .validate_and_extract_identity(&mint("usr_1", None, -600))
            .await
            .unwrap_err();
        assert_eq!(err.code, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let provider = JwtIdentityProvider::new(SECRET, Some("https://auth.example"));
        assert!(provider
            .validate_and_extract_identity(&mint("usr_1", Some("https://evil.example"), 300))
            .await
            .is_err());
        assert!(provider
            .validate_and_extract_identity(&mint("usr_1", Some("https://auth.example"), 300))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let provider = JwtIdentityProvider::new(SECRET, None);
        assert!(provider.validate_and_extract_identity("not-a-jwt").await.is_err());
    }
}
