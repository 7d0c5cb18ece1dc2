//! WebSocket close codes surfaced to room clients.
//!
//! Clients map these to UI messages, so the numeric values are part of
//! the wire contract.

use std::fmt;

/// Close code taxonomy for room connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// 1000 - normal closure.
    Normal,
    /// 1001 - server going away (shutdown, evicted queue).
    GoingAway,
    /// 4001 - identity could not be resolved.
    Unauthorized,
    /// 4002 - client left the room permanently.
    Abandoned,
    /// 4003 - user already connected to this room.
    DuplicateSession,
    /// 4004 - room does not exist.
    RoomNotFound,
    /// 4005 - collaborator failure during admission.
    InternalError,
}

impl CloseCode {
    /// Numeric code written into the close frame.
    pub fn code(self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::Unauthorized => 4001,
            CloseCode::Abandoned => 4002,
            CloseCode::DuplicateSession => 4003,
            CloseCode::RoomNotFound => 4004,
            CloseCode::InternalError => 4005,
        }
    }

    /// Short reason written next to the code.
    pub fn reason(self) -> &'static str {
        match self {
            CloseCode::Normal => "closed",
            CloseCode::GoingAway => "going away",
            CloseCode::Unauthorized => "unauthorized",
            CloseCode::Abandoned => "abandoned",
            CloseCode::DuplicateSession => "duplicate session",
            CloseCode::RoomNotFound => "room not found",
            CloseCode::InternalError => "internal error",
        }
    }

    /// Looks up a known code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1000 => Some(CloseCode::Normal),
            1001 => Some(CloseCode::GoingAway),
            4001 => Some(CloseCode::Unauthorized),
            4002 => Some(CloseCode::Abandoned),
            4003 => Some(CloseCode::DuplicateSession),
            4004 => Some(CloseCode::RoomNotFound),
            4005 => Some(CloseCode::InternalError),
            _ => None,
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.reason())
    }
}
