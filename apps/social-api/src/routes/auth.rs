//! Auth routes: identity login, token refresh, and gateway tickets.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::auth::tokens::{self, TokenData};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/gateway/ticket", post(gateway_ticket))
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/login
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Identity token issued by the auth service.
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
    pub ws_ticket: String,
    pub ws_url: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing identity token", body = ApiErrorBody),
        (status = 401, description = "Invalid identity token", body = ApiErrorBody),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if body.token.trim().is_empty() {
        return Err(ApiError::validation(vec![FieldError {
            field: "token".to_string(),
            message: "must not be empty".to_string(),
        }]));
    }

    let identity = state
        .identity
        .validate_and_extract_identity(&body.token)
        .await?;
    let data = TokenData::from(&identity);

    let kv = state.kv.as_ref();
    let access_token = tokens::generate_access_token();
    let refresh_token = tokens::generate_refresh_token();
    tokens::store_access_token(kv, &access_token, &data).await?;
    tokens::store_refresh_token(kv, &refresh_token, &data).await?;
    let ws_ticket = tokens::issue_ws_ticket(kv, &data).await?;

    tracing::info!(user_id = %identity.user_id, "user logged in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: tokens::ACCESS_TTL_SECS,
        refresh_token,
        ws_ticket,
        ws_url: ws_url(&state),
        user: UserInfo {
            id: identity.user_id,
            username: identity.username,
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/refresh
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = RefreshResponse),
        (status = 401, description = "Invalid refresh token", body = ApiErrorBody),
    ),
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let kv = state.kv.as_ref();

    // Single-use rotation.
    let data = tokens::consume_refresh_token(kv, &body.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let access_token = tokens::generate_access_token();
    let refresh_token = tokens::generate_refresh_token();
    tokens::store_access_token(kv, &access_token, &data).await?;
    tokens::store_refresh_token(kv, &refresh_token, &data).await?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: tokens::ACCESS_TTL_SECS,
        refresh_token,
    }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/gateway/ticket
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct GatewayTicketResponse {
    pub ws_ticket: String,
    pub ws_url: String,
    pub expires_in: u64,
}

#[utoipa::path(
    post,
    path = "/api/v1/gateway/ticket",
    tag = "Auth",
    responses(
        (status = 200, description = "Single-use gateway ticket", body = GatewayTicketResponse),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn gateway_ticket(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<GatewayTicketResponse>, ApiError> {
    let data = TokenData::from(&identity);
    let ws_ticket = tokens::issue_ws_ticket(state.kv.as_ref(), &data).await?;

    Ok(Json(GatewayTicketResponse {
        ws_ticket,
        ws_url: ws_url(&state),
        expires_in: tokens::WS_TICKET_TTL_SECS,
    }))
}

fn ws_url(state: &AppState) -> String {
    format!("ws://localhost:{}/gateway", state.config.port)
}
