//! WebSocket upgrade handler for room connections.
//!
//! Handles the HTTP → WebSocket upgrade and the connection lifecycle:
//! 1. Read session/guest cookies from the upgrade request
//! 2. Upgrade to WebSocket (frames above the configured size are refused)
//! 3. Screen identity, room and duplicate sessions, closing with 4001-4005
//! 4. Run the join-code challenge when the room asks for one
//! 5. Register with the room's hub and pump frames until disconnect

use std::sync::Arc;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};

use super::auth_gate::{credentials_from_headers, run_join_challenge, AdmissionError, AuthGate};
use super::close_frame;
use super::event_bridge::ApiEventBridge;
use super::hub::{Hub, HubHandle};
use super::subscriber;
use crate::application::dispatch::DispatchTable;
use crate::config::{AuthConfig, HubConfig};
use crate::domain::foundation::Credentials;
use crate::domain::room::RoomKind;
use crate::ports::{IdentityResolver, RoomDirectory, RoomStateReader};

/// Collaborators serving one room kind.
pub struct ChannelPorts {
    pub directory: Arc<dyn RoomDirectory>,
    pub state: Arc<dyn RoomStateReader>,
    pub identity: Arc<dyn IdentityResolver>,
}

/// Everything needed to serve one room kind: its hub, its dispatch table
/// and the collaborators behind them.
///
/// Cheap to clone; used as axum state for the kind's upgrade route.
#[derive(Clone)]
pub struct RoomChannel {
    hub: HubHandle,
    table: Arc<DispatchTable>,
    directory: Arc<dyn RoomDirectory>,
    state: Arc<dyn RoomStateReader>,
    identity: Arc<dyn IdentityResolver>,
    hub_config: Arc<HubConfig>,
    auth_config: Arc<AuthConfig>,
}

impl RoomChannel {
    /// Spawns the hub for the table's room kind.
    pub fn new(table: DispatchTable, ports: ChannelPorts, hub_config: HubConfig, auth_config: AuthConfig) -> Self {
        Self {
            hub: Hub::spawn(table.kind()),
            table: Arc::new(table),
            directory: ports.directory,
            state: ports.state,
            identity: ports.identity,
            hub_config: Arc::new(hub_config),
            auth_config: Arc::new(auth_config),
        }
    }

    pub fn kind(&self) -> RoomKind {
        self.table.kind()
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    pub fn directory(&self) -> &dyn RoomDirectory {
        self.directory.as_ref()
    }

    pub fn state(&self) -> &dyn RoomStateReader {
        self.state.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityResolver {
        self.identity.as_ref()
    }

    pub fn hub_config(&self) -> &HubConfig {
        &self.hub_config
    }

    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth_config
    }

    /// Entry point for injecting events without an open connection.
    pub fn bridge(&self) -> ApiEventBridge {
        ApiEventBridge::new(self.clone())
    }

    /// Route path for this kind's upgrade endpoint.
    pub fn route_path(&self) -> String {
        format!("/{}/room/{{room_id}}", self.kind())
    }
}

/// Handle WebSocket upgrade requests for a room.
///
/// Route: `GET /{kind}/room/{room_id}`
///
/// Admission runs after the upgrade so refusals can carry a close code.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    State(channel): State<RoomChannel>,
) -> Response {
    let credentials = credentials_from_headers(&headers, channel.auth_config());

    ws.max_message_size(channel.hub_config().max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(socket, room_id, credentials, channel))
}

/// Handle an established WebSocket connection from screening to teardown.
async fn handle_socket(
    mut socket: WebSocket,
    room_id: String,
    credentials: Credentials,
    channel: RoomChannel,
) {
    let gate = AuthGate::new(channel.identity(), channel.directory());

    let admitted = match gate.screen(&credentials, &room_id).await {
        Ok(screened) if screened.needs_join_code => run_join_challenge(
            &mut socket,
            channel.kind(),
            &screened.room,
            &screened.user,
            channel.hub_config().join_code_timeout(),
        )
        .await
        .map(|()| screened),
        other => other,
    };

    match admitted {
        Ok(screened) => subscriber::admit(socket, channel, screened.user, screened.room).await,
        Err(err) => refuse(socket, &channel, &room_id, err).await,
    }
}

async fn refuse(mut socket: WebSocket, channel: &RoomChannel, room_id: &str, err: AdmissionError) {
    let code = err.close_code();
    if err.is_internal() {
        tracing::error!(
            kind = %channel.kind(),
            room_id = %room_id,
            close_code = code.code(),
            error = %err,
            "Admission failed"
        );
    } else {
        tracing::debug!(
            kind = %channel.kind(),
            room_id = %room_id,
            close_code = code.code(),
            reason = %err,
            "Connection refused"
        );
    }

    if !matches!(err, AdmissionError::Disconnected) {
        let _ = socket.send(close_frame(code)).await;
    }
}

/// Liveness probe reporting how many rooms each hub is serving.
async fn health(State(hubs): State<Arc<Vec<HubHandle>>>) -> impl IntoResponse {
    let mut rooms = Map::new();
    for hub in hubs.iter() {
        rooms.insert(hub.kind().to_string(), Value::from(hub.active_rooms().await.len()));
    }
    Json(json!({ "status": "ok", "activeRooms": rooms }))
}

/// Build the room router.
///
/// Serves `GET /{kind}/room/{room_id}` for every channel plus `GET /health`.
pub fn room_router(channels: &[RoomChannel]) -> Router {
    let hubs: Arc<Vec<HubHandle>> = Arc::new(channels.iter().map(|c| c.hub().clone()).collect());
    let base = Router::new().route("/health", get(health)).with_state(hubs);

    channels.iter().fold(base, |router, channel| {
        router.merge(
            Router::new()
                .route(&channel.route_path(), get(ws_handler))
                .with_state(channel.clone()),
        )
    })
}
