//! Bearer authentication for the REST surface.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::identity::Identity;
use crate::auth::tokens;
use crate::error::ApiError;
use crate::AppState;

/// The caller behind `Authorization: Bearer <access token>`.
///
/// Rejects with a 401 [`ApiError`] when the header is absent, malformed, or
/// names a token that was never issued or has expired.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

/// Pull the token out of a `Bearer` authorization value. The scheme is
/// matched case-insensitively.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?
            .to_str()
            .map_err(|_| ApiError::unauthorized("Malformed Authorization header"))?;

        let token = bearer_token(value)
            .ok_or_else(|| ApiError::unauthorized("Expected a Bearer access token"))?;

        match tokens::lookup_access_token(state.kv.as_ref(), token).await? {
            Some(data) => Ok(AuthUser(data.into())),
            None => Err(ApiError::unauthorized("Access token is invalid or expired")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::bearer_token;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer sat_abc"), Some("sat_abc"));
        assert_eq!(bearer_token("bearer sat_abc"), Some("sat_abc"));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_rejected() {
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("sat_abc"), None);
    }
}
