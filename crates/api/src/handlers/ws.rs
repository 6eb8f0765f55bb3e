//! Authenticated real-time event stream (spec §6): `GET /ws`.
//!
//! Pure server-to-client fanout of `EventBus` events for the caller's
//! tenant — there is no client-writable side, so this is considerably
//! simpler than a bidirectional socket, but borrows the same upgrade/
//! heartbeat/idle-timeout shape.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sentry_core::RequestContext;
use std::time::Duration;
use tracing::{debug, info};

use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/", get(upgrade))
}

async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    context: RequestContext,
) -> Response {
    let Some(tenant_id) = context.tenant_id() else {
        return axum::http::StatusCode::UNAUTHORIZED.into_response();
    };
    ws.on_upgrade(move |socket| handle_stream(socket, state, tenant_id))
}

async fn handle_stream(mut socket: WebSocket, state: AppState, tenant_id: sentry_core::TenantId) {
    let (connection_id, receiver) = state.event_bus.subscribe(tenant_id);
    info!(%tenant_id, %connection_id, "event stream connected");

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            event = tokio::time::timeout(IDLE_TIMEOUT, receiver.recv()) => {
                match event {
                    Ok(Some(event)) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(_) => continue,
                        };
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        debug!(%connection_id, "event stream idle timeout");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.event_bus.unsubscribe(tenant_id, connection_id);
    info!(%tenant_id, %connection_id, "event stream disconnected");
}
