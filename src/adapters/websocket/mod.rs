//! WebSocket adapters for live room connections.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              GET /{kind}/room/{room_id}  (ws_handler)               │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │ upgrade
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            AuthGate                                  │
//! │   identify (4001) → room (4004) → duplicate (4003/4005) → join code │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │ admit
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Hub (one task per room kind)                    │
//! │   Room: game-1         Room: game-2          Room: game-3           │
//! │   ├── sub-a            ├── sub-d             └── sub-g              │
//! │   └── sub-b            └── sub-e                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//!          ▲ broadcast                                 │ outbound queues
//!          │                                           ▼
//!   read pump / ApiEventBridge                    write pumps
//! ```
//!
//! # Components
//!
//! - [`hub`] - single-owner room registry
//! - [`auth_gate`] - admission checks and the join-code challenge
//! - [`subscriber`] - read/write pumps and teardown
//! - [`handler`] - axum upgrade handler, per-kind channels and router
//! - [`event_bridge`] - event injection without a connection

pub mod auth_gate;
pub mod event_bridge;
pub mod handler;
pub mod hub;
pub mod subscriber;

pub use auth_gate::{credentials_from_headers, AdmissionError, AuthGate, Screened};
pub use event_bridge::ApiEventBridge;
pub use handler::{room_router, ws_handler, ChannelPorts, RoomChannel};
pub use hub::{Hub, HubHandle, Subscriber, SubscriberId};

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};

use crate::application::dispatch::EventRejection;
use crate::domain::foundation::{RoomId, UserId};
use crate::domain::room::{CloseCode, Envelope, Payload};

fn text_frame(payload: &Payload) -> Message {
    Message::Text(Utf8Bytes::from(&**payload))
}

fn close_frame(code: CloseCode) -> Message {
    Message::Close(Some(CloseFrame {
        code: code.code(),
        reason: Utf8Bytes::from_static(code.reason()),
    }))
}

fn broadcast_envelope(hub: &HubHandle, room_id: &RoomId, envelope: &Envelope) {
    match envelope.encode() {
        Ok(payload) => hub.broadcast(room_id, payload),
        Err(err) => tracing::error!(
            room_id = %room_id,
            event_type = %envelope.event_type,
            error = %err,
            "Failed to encode envelope"
        ),
    }
}

/// Logs a rejected event at the level its cause deserves.
///
/// Client mistakes stay at warn or below; only collaborator failures are
/// errors.
fn log_rejection(rejection: &EventRejection, room_id: &RoomId, user_id: &UserId) {
    match rejection {
        EventRejection::Malformed(_) | EventRejection::UnknownEventType(_) => {
            tracing::warn!(room_id = %room_id, user_id = %user_id, reason = %rejection, "Dropped invalid event");
        }
        EventRejection::Unauthorized(event_type) => {
            tracing::debug!(
                room_id = %room_id,
                user_id = %user_id,
                event_type = %event_type,
                "Elevated event refused"
            );
        }
        EventRejection::HandlerFailed { event_type, source } if rejection.is_internal() => {
            tracing::error!(
                room_id = %room_id,
                user_id = %user_id,
                event_type = %event_type,
                error = %source,
                "Event handler failed"
            );
        }
        EventRejection::HandlerFailed { event_type, source } => {
            tracing::warn!(
                room_id = %room_id,
                user_id = %user_id,
                event_type = %event_type,
                error = %source,
                "Event rejected by handler"
            );
        }
    }
}
