//! Admission checks run before a connection joins a room.
//!
//! ```text
//! Identify ──► ResolveRoom ──► CheckDuplicate ──► needs join code? ──► Admit
//!   4001          4004          4003 / 4005              │
//!                                                        ▼
//!                                            join_code_required
//!                                                        │
//!                                      auth_<kind> ──► match? ── no ──► join_code_incorrect ─┐
//!                                                        │ yes                                │
//!                                                        ▼                                    │
//!                                                      Admit  ◄──────────── next attempt ─────┘
//! ```
//!
//! [`AuthGate::screen`] runs the first three steps against the
//! collaborators only. The challenge needs the socket and lives in
//! [`run_join_challenge`].

use axum::extract::ws::{Message, WebSocket};
use axum::http::{header, HeaderMap};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

use super::text_frame;
use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, Credentials, DomainError, ErrorCode, RoomId, RoomUser};
use crate::domain::room::{CloseCode, Envelope, Room, RoomKind, JOIN_CODE_INCORRECT, JOIN_CODE_REQUIRED};
use crate::ports::{IdentityResolver, RoomDirectory};

/// Why a connection was refused.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Identity could not be resolved: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("User is already connected to this room")]
    DuplicateSession,

    #[error("Collaborator failed during admission: {0}")]
    Collaborator(#[source] DomainError),

    #[error("No join code received in time")]
    JoinCodeTimeout,

    #[error("Connection closed during admission")]
    Disconnected,
}

impl AdmissionError {
    /// Close code sent to the client.
    pub fn close_code(&self) -> CloseCode {
        match self {
            AdmissionError::Unauthorized(_) | AdmissionError::JoinCodeTimeout => {
                CloseCode::Unauthorized
            }
            AdmissionError::RoomNotFound(_) => CloseCode::RoomNotFound,
            AdmissionError::DuplicateSession => CloseCode::DuplicateSession,
            AdmissionError::Collaborator(_) => CloseCode::InternalError,
            AdmissionError::Disconnected => CloseCode::Normal,
        }
    }

    /// True when the refusal points at a broken collaborator.
    pub fn is_internal(&self) -> bool {
        match self {
            AdmissionError::Collaborator(_) => true,
            AdmissionError::Unauthorized(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Result of a successful screening.
#[derive(Debug, Clone)]
pub struct Screened {
    pub user: RoomUser,
    pub room: Room,
    /// The user must answer the join-code challenge before admission.
    pub needs_join_code: bool,
}

/// Identity, room and duplicate-session checks for one room kind.
pub struct AuthGate<'a> {
    identity: &'a dyn IdentityResolver,
    directory: &'a dyn RoomDirectory,
}

impl<'a> AuthGate<'a> {
    pub fn new(identity: &'a dyn IdentityResolver, directory: &'a dyn RoomDirectory) -> Self {
        Self {
            identity,
            directory,
        }
    }

    /// Runs identify, resolve-room and duplicate-session checks in order.
    pub async fn screen(
        &self,
        credentials: &Credentials,
        raw_room_id: &str,
    ) -> Result<Screened, AdmissionError> {
        let user = self.identity.resolve(credentials).await?;

        let room_id =
            RoomId::new(raw_room_id).map_err(|_| AdmissionError::RoomNotFound(raw_room_id.to_string()))?;
        let room = self.directory.get_room(&room_id).await.map_err(|err| {
            if err.code() == ErrorCode::RoomNotFound {
                AdmissionError::RoomNotFound(raw_room_id.to_string())
            } else {
                AdmissionError::Collaborator(err)
            }
        })?;

        let membership = self
            .directory
            .get_membership(&room.id, &user.id)
            .await
            .map_err(AdmissionError::Collaborator)?;

        if membership.is_some_and(|row| row.active) {
            return Err(AdmissionError::DuplicateSession);
        }

        Ok(Screened {
            needs_join_code: room.requires_join_code() && membership.is_none(),
            user,
            room,
        })
    }
}

/// Extracts session and guest cookie values from the upgrade request.
///
/// Cookies with an empty value count as absent.
pub fn credentials_from_headers(headers: &HeaderMap, auth: &AuthConfig) -> Credentials {
    let mut credentials = Credentials::default();

    let pairs = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='));

    for (name, value) in pairs {
        let value = value.trim().trim_matches('"');
        if value.is_empty() {
            continue;
        }
        if name == auth.session_cookie_name {
            credentials.session_token = Some(value.to_string());
        } else if name == auth.guest_cookie_name {
            credentials.guest_token = Some(value.to_string());
        }
    }

    credentials
}

/// How a frame received during the challenge is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
    Accepted,
    Rejected,
    /// Not a join-code frame; dropped without a reply.
    Ignored,
}

pub(crate) fn judge_attempt(kind: RoomKind, room: &Room, text: &str) -> Attempt {
    match Envelope::parse(text) {
        Ok(envelope) if envelope.event_type == kind.auth_event_type() => {
            if room.join_code_matches(&envelope.value) {
                Attempt::Accepted
            } else {
                Attempt::Rejected
            }
        }
        _ => Attempt::Ignored,
    }
}

/// Runs the join-code challenge on a screened connection.
///
/// Each prompt opens a fresh `attempt_timeout` window. Only `auth_<kind>`
/// frames are considered; everything else is dropped.
pub async fn run_join_challenge(
    socket: &mut WebSocket,
    kind: RoomKind,
    room: &Room,
    user: &RoomUser,
    attempt_timeout: std::time::Duration,
) -> Result<(), AdmissionError> {
    let mut prompt = JOIN_CODE_REQUIRED;

    loop {
        let frame = Envelope::new(prompt, "")
            .encode()
            .map_err(AdmissionError::Collaborator)?;
        socket
            .send(text_frame(&frame))
            .await
            .map_err(|_| AdmissionError::Disconnected)?;

        let deadline = Instant::now() + attempt_timeout;
        loop {
            let message = match timeout_at(deadline, socket.recv()).await {
                Err(_) => return Err(AdmissionError::JoinCodeTimeout),
                Ok(None) | Ok(Some(Err(_))) => return Err(AdmissionError::Disconnected),
                Ok(Some(Ok(message))) => message,
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => return Err(AdmissionError::Disconnected),
                _ => continue,
            };

            match judge_attempt(kind, room, text.as_str()) {
                Attempt::Accepted => return Ok(()),
                Attempt::Rejected => {
                    tracing::debug!(
                        room_id = %room.id,
                        user_id = %user.id,
                        "Incorrect join code"
                    );
                    prompt = JOIN_CODE_INCORRECT;
                    break;
                }
                Attempt::Ignored => {
                    tracing::debug!(
                        room_id = %room.id,
                        user_id = %user.id,
                        "Ignoring frame while awaiting join code"
                    );
                }
            }
        }
    }
}
