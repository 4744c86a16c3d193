//! Notification endpoints: paged listing, unread views, and read state.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::identity::Identity;
use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiErrorBody};
use crate::models::notification::{Notification, NotificationFilter, NotificationPage};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications).delete(delete_notifications),
        )
        .route("/notifications/unread", get(list_unread))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", put(mark_all_read))
        .route("/notifications/{notification_id}/read", put(mark_read))
}

// ---------------------------------------------------------------------------
// GET /api/v1/notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    #[serde(default)]
    pub filter: NotificationFilter,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "Notifications",
    security(("bearer" = [])),
    params(
        ("page" = Option<u32>, Query, description = "Zero-based page number (default 0)"),
        ("size" = Option<u32>, Query, description = "Page size (1-100, default 10)"),
        ("filter" = Option<NotificationFilter>, Query, description = "all or unread (default all)"),
    ),
    responses(
        (status = 200, description = "Notifications, newest first", body = NotificationPage),
        (status = 400, description = "Malformed query parameters", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn list_notifications(
    AuthUser(Identity { user_id, .. }): AuthUser,
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<NotificationPage>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let page = state
        .notifications
        .page(
            &user_id,
            params.page.unwrap_or(0),
            params.size.unwrap_or(10),
            params.filter,
        )
        .await?;
    Ok(Json(page))
}

// ---------------------------------------------------------------------------
// GET /api/v1/notifications/unread
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Unread notifications, newest first", body = Vec<Notification>),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn list_unread(
    AuthUser(Identity { user_id, .. }): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.notifications.unread(&user_id).await?))
}

// ---------------------------------------------------------------------------
// GET /api/v1/notifications/unread-count
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread-count",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Number of unread notifications", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn unread_count(
    AuthUser(Identity { user_id, .. }): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = state.notifications.unread_count(&user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

// ---------------------------------------------------------------------------
// PUT /api/v1/notifications/{notification_id}/read
// ---------------------------------------------------------------------------

#[utoipa::path(
    put,
    path = "/api/v1/notifications/{notification_id}/read",
    tag = "Notifications",
    security(("bearer" = [])),
    params(("notification_id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Notification belongs to another user", body = ApiErrorBody),
        (status = 404, description = "Notification not found", body = ApiErrorBody),
    ),
)]
pub async fn mark_read(
    AuthUser(Identity { user_id, .. }): AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let id: i64 = notification_id
        .parse()
        .map_err(|_| ApiError::not_found("Notification not found"))?;

    let notification = state.notifications.mark_read(id, &user_id).await?;
    Ok(Json(notification))
}

// ---------------------------------------------------------------------------
// PUT /api/v1/notifications/read-all
// ---------------------------------------------------------------------------

#[utoipa::path(
    put,
    path = "/api/v1/notifications/read-all",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "All notifications marked read"),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn mark_all_read(
    AuthUser(Identity { user_id, .. }): AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.notifications.mark_all_read(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// DELETE /api/v1/notifications
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/api/v1/notifications",
    tag = "Notifications",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "All notifications deleted"),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
    ),
)]
pub async fn delete_notifications(
    AuthUser(Identity { user_id, .. }): AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.notifications.delete_all(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
