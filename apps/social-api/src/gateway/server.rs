//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time;

use crate::AppState;

use super::connection::{CloseReason, ConnectionHandle, OutboundEvent};
use super::events::{
    ClientMessage, GatewayMessage, HeartbeatPayload, IdentifyPayload, CLOSE_DELIVERY_FAILED,
    CLOSE_NOT_AUTHENTICATED, CLOSE_POLICY_VIOLATION, CLOSE_SESSION_SUPERSEDED, CLOSE_SESSION_TIMEOUT, CLOSE_UNKNOWN_ERROR,
    CLOSE_UNKNOWN_OPCODE, OP_HEARTBEAT, OP_IDENTIFY, OP_REQUEST,
};
use super::handler::{handle_identify, handle_request, ready_message, HEARTBEAT_INTERVAL_MS};
use super::registry::SessionRegistry;
use super::session::GatewaySession;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// Timeout for receiving IDENTIFY after connection (seconds).
const IDENTIFY_TIMEOUT_SECS: u64 = 10;

/// Why the handshake did not produce an IDENTIFY payload.
enum HandshakeError {
    Closed,
    Rejected(u16, &'static str),
}

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Step 1: Wait for IDENTIFY within timeout.
    let payload = match time::timeout(
        Duration::from_secs(IDENTIFY_TIMEOUT_SECS),
        await_identify(&mut ws_rx),
    )
    .await
    {
        Ok(Ok(payload)) => payload,
        Ok(Err(HandshakeError::Closed)) => return,
        Ok(Err(HandshakeError::Rejected(code, reason))) => {
            tracing::debug!(%reason, "gateway handshake rejected");
            let _ = send_close(&mut ws_tx, code, reason).await;
            return;
        }
        Err(_timeout) => {
            let _ = send_close(&mut ws_tx, CLOSE_SESSION_TIMEOUT, "Handshake timeout").await;
            return;
        }
    };

    // Step 2: Resolve the ticket. Nothing is registered for a failed identify.
    let session = match handle_identify(&state, payload).await {
        Ok(session) => Arc::new(session),
        Err(reason) => {
            tracing::debug!(%reason, "identify rejected");
            let _ = send_close(&mut ws_tx, CLOSE_POLICY_VIOLATION, reason).await;
            return;
        }
    };

    // Step 3: Bind the connection. The guard unbinds it on every exit path.
    let (handle, outbound_rx) =
        ConnectionHandle::new(session.user_id.clone(), state.config.outbound_buffer);
    let _guard = SessionGuard {
        registry: state.sessions.clone(),
        connection_id: handle.id().to_string(),
        user_id: session.user_id.clone(),
    };

    if let Some(previous) = state.sessions.register(&session.user_id, handle.clone()) {
        tracing::debug!(
            user_id = %session.user_id,
            superseded = %previous.id(),
            "previous connection superseded"
        );
        if state.config.close_superseded_sessions {
            previous.request_close(CloseReason::Superseded);
        }
    }

    tracing::info!(
        session_id = %session.session_id,
        conn_id = %handle.id(),
        user_id = %session.user_id,
        "gateway session established"
    );

    let ready = ready_message(&state, &session, handle.id()).await;
    if !send_message(&mut ws_tx, &ready).await {
        return;
    }

    run_session(&state, session.clone(), handle, ws_tx, ws_rx, outbound_rx).await;

    tracing::info!(
        session_id = %session.session_id,
        user_id = %session.user_id,
        "gateway session ended"
    );
}

/// Read frames until the client sends IDENTIFY.
async fn await_identify(ws_rx: &mut WsStream) -> Result<IdentifyPayload, HandshakeError> {
    while let Some(msg) = ws_rx.next().await {
        let text = match msg {
            Ok(Message::Text(t)) => t,
            Ok(Message::Close(_)) => return Err(HandshakeError::Closed),
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(?e, "ws read error during identify");
                return Err(HandshakeError::Closed);
            }
        };

        let client_msg: ClientMessage = serde_json::from_str(&text)
            .map_err(|_| HandshakeError::Rejected(CLOSE_UNKNOWN_ERROR, "Invalid JSON"))?;

        if client_msg.op != OP_IDENTIFY {
            return Err(HandshakeError::Rejected(
                CLOSE_NOT_AUTHENTICATED,
                "Expected IDENTIFY",
            ));
        }

        return serde_json::from_value(client_msg.d).map_err(|_| {
            HandshakeError::Rejected(CLOSE_POLICY_VIOLATION, "Invalid identify payload")
        });
    }
    Err(HandshakeError::Closed)
}

/// Main session event loop: answer client frames, forward pushes, enforce heartbeat.
async fn run_session(
    state: &AppState,
    session: Arc<GatewaySession>,
    handle: ConnectionHandle,
    mut ws_tx: WsSink,
    mut ws_rx: WsStream,
    mut outbound_rx: mpsc::Receiver<OutboundEvent>,
) {
    // Heartbeat deadline: client must heartbeat within 1.5× the interval.
    let heartbeat_deadline = Duration::from_millis(HEARTBEAT_INTERVAL_MS * 3 / 2);
    let mut heartbeat_timer = time::interval(heartbeat_deadline);
    heartbeat_timer.tick().await; // First tick fires immediately; skip it.
    let mut got_heartbeat = true;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let client_msg: ClientMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(_) => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Invalid JSON").await;
                                break;
                            }
                        };

                        match client_msg.op {
                            OP_HEARTBEAT => {
                                got_heartbeat = true;
                                let payload: HeartbeatPayload =
                                    serde_json::from_value(client_msg.d).unwrap_or(HeartbeatPayload { seq: 0 });
                                if !send_message(&mut ws_tx, &GatewayMessage::heartbeat_ack(payload.seq)).await {
                                    break;
                                }
                            }
                            OP_REQUEST => {
                                let reply = handle_request(state, &session, client_msg).await;
                                if !send_message(&mut ws_tx, &reply).await {
                                    break;
                                }
                            }
                            OP_IDENTIFY => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Already identified").await;
                                break;
                            }
                            _ => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_OPCODE, "Unknown opcode").await;
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, session_id = %session.session_id, "ws read error");
                        break;
                    }
                    Some(Ok(_)) => continue,
                }
            }

            // Push from the dispatcher.
            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                let msg = GatewayMessage::dispatch(event.name, session.next_seq(), event.data);
                if !send_message(&mut ws_tx, &msg).await {
                    break;
                }
            }

            // Superseded by a newer connection, or evicted after a failed push.
            reason = handle.close_requested() => {
                let (code, text) = match reason {
                    CloseReason::Superseded => (CLOSE_SESSION_SUPERSEDED, "Session superseded"),
                    CloseReason::Evicted => (CLOSE_DELIVERY_FAILED, "Delivery failed"),
                };
                tracing::debug!(session_id = %session.session_id, ?reason, "closing connection");
                let _ = send_close(&mut ws_tx, code, text).await;
                break;
            }

            _ = heartbeat_timer.tick() => {
                if !got_heartbeat {
                    tracing::debug!(
                        session_id = %session.session_id,
                        "heartbeat timeout, closing connection"
                    );
                    let _ = send_close(&mut ws_tx, CLOSE_SESSION_TIMEOUT, "Heartbeat timeout").await;
                    break;
                }
                got_heartbeat = false;
            }
        }
    }
}

/// Unbinds a connection from the registry when its task ends, however it ends.
struct SessionGuard {
    registry: Arc<SessionRegistry>,
    connection_id: String,
    user_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.registry.remove_by_connection(&self.connection_id) {
            tracing::debug!(
                conn_id = %self.connection_id,
                user_id = %self.user_id,
                "connection unbound"
            );
        }
    }
}

/// Serialize and send one message. Returns false once the socket is unusable.
async fn send_message(ws_tx: &mut WsSink, msg: &GatewayMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize gateway message");
            return true;
        }
    };
    ws_tx.send(Message::Text(json.into())).await.is_ok()
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
