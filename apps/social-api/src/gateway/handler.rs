//! Opcode handling for bound and binding connections: IDENTIFY and REQUEST.

use serde_json::{json, Value};

use crate::auth::identity::Identity;
use crate::auth::tokens;
use crate::error::ApiError;
use crate::AppState;

use super::events::{ClientMessage, EventName, GatewayMessage, IdentifyPayload, MarkReadPayload, RequestName};
use super::session::GatewaySession;

/// Heartbeat interval sent to clients in the READY payload (ms).
pub const HEARTBEAT_INTERVAL_MS: u64 = 41250;

/// Resolve an IDENTIFY ticket into a session. The ticket is consumed.
pub async fn handle_identify(
    state: &AppState,
    payload: IdentifyPayload,
) -> Result<GatewaySession, &'static str> {
    let ticket_data = tokens::consume_ws_ticket(state.kv.as_ref(), &payload.ticket)
        .await
        .map_err(|_| "Ticket lookup failed")?
        .ok_or("Invalid or expired ticket")?;

    Ok(GatewaySession::new(Identity::from(ticket_data)))
}

/// Build the READY dispatch for a freshly bound session.
pub async fn ready_message(
    state: &AppState,
    session: &GatewaySession,
    connection_id: &str,
) -> GatewayMessage {
    let unread_count = match state.notifications.unread_count(&session.user_id).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(user_id = %session.user_id, error = %e, "unread count unavailable for READY");
            0
        }
    };

    let data = json!({
        "session_id": session.session_id,
        "connection_id": connection_id,
        "user": {
            "id": session.user_id,
            "username": session.username,
        },
        "unread_count": unread_count,
        "heartbeat_interval": HEARTBEAT_INTERVAL_MS,
    });

    GatewayMessage::dispatch(EventName::READY, session.next_seq(), data)
}

/// Answer a pull REQUEST (`op = 8`). Failures become an ERROR dispatch.
pub async fn handle_request(
    state: &AppState,
    session: &GatewaySession,
    msg: ClientMessage,
) -> GatewayMessage {
    let request = msg.t.as_deref().unwrap_or_default();
    let (event, result) = match request {
        RequestName::UNREAD => (
            EventName::NOTIFICATIONS_UNREAD,
            unread(state, &session.user_id).await,
        ),
        RequestName::COUNT => (
            EventName::NOTIFICATIONS_COUNT,
            count(state, &session.user_id).await,
        ),
        RequestName::MARK_READ => (
            EventName::NOTIFICATION_MARKED,
            mark_read(state, &session.user_id, msg.d).await,
        ),
        other => (
            EventName::ERROR,
            Err(ApiError::bad_request(format!("Unknown request: {other}"))),
        ),
    };

    let seq = session.next_seq();
    match result {
        Ok(data) => GatewayMessage::reply(event, seq, msg.nonce, data),
        Err(err) => {
            tracing::debug!(
                session_id = %session.session_id,
                request,
                code = %err.code,
                "gateway request failed"
            );
            let data = json!({
                "request": request,
                "code": err.code,
                "message": err.message,
            });
            GatewayMessage::reply(EventName::ERROR, seq, msg.nonce, data)
        }
    }
}

async fn unread(state: &AppState, user_id: &str) -> Result<Value, ApiError> {
    let notifications = state.notifications.unread(user_id).await?;
    Ok(json!({ "notifications": notifications }))
}

async fn count(state: &AppState, user_id: &str) -> Result<Value, ApiError> {
    let count = state.notifications.unread_count(user_id).await?;
    Ok(json!({ "count": count }))
}

async fn mark_read(state: &AppState, user_id: &str, d: Value) -> Result<Value, ApiError> {
    let id = serde_json::from_value::<MarkReadPayload>(d)
        .ok()
        .and_then(|p| p.id())
        .ok_or_else(|| ApiError::bad_request("notification_id is required"))?;

    let notification = state.notifications.mark_read(id, user_id).await?;
    serde_json::to_value(notification).map_err(|_| ApiError::internal("serialization"))
}
