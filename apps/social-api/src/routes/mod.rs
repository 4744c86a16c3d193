pub mod auth;
pub mod health;
pub mod notifications;

use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest(
            "/api/v1",
            auth::router().merge(notifications::router()),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Auth
        auth::login,
        auth::refresh,
        auth::gateway_ticket,
        // Notifications
        notifications::list_notifications,
        notifications::list_unread,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::delete_notifications,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::notification::Notification,
            crate::models::notification::NotificationType,
            crate::models::notification::NotificationFilter,
            crate::models::notification::NotificationPage,
            // Route request/response types
            health::HealthResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            auth::RefreshRequest,
            auth::RefreshResponse,
            auth::GatewayTicketResponse,
            notifications::UnreadCountResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Auth", description = "Authentication and gateway tickets"),
        (name = "Notifications", description = "Notification inbox"),
    )
)]
pub struct ApiDoc;
