//! The four room domains served by the hub.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Kind of collaboration room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    /// Estimation game (planning poker).
    Poker,
    /// Retrospective.
    Retro,
    /// Story mapping board.
    Storyboard,
    /// Asynchronous team check-in.
    Checkin,
}

impl RoomKind {
    /// All kinds, in routing order.
    pub const ALL: [RoomKind; 4] = [
        RoomKind::Poker,
        RoomKind::Retro,
        RoomKind::Storyboard,
        RoomKind::Checkin,
    ];

    /// Lowercase name used in routes and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            RoomKind::Poker => "poker",
            RoomKind::Retro => "retro",
            RoomKind::Storyboard => "storyboard",
            RoomKind::Checkin => "checkin",
        }
    }

    /// Reserved inbound event type carrying join-code attempts.
    ///
    /// Never present in a dispatch table.
    pub fn auth_event_type(self) -> &'static str {
        match self {
            RoomKind::Poker => "auth_poker",
            RoomKind::Retro => "auth_retro",
            RoomKind::Storyboard => "auth_storyboard",
            RoomKind::Checkin => "auth_checkin",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoomKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("room_kind", format!("unknown kind '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_event_type_is_prefixed_by_kind() {
        for kind in RoomKind::ALL {
            assert_eq!(kind.auth_event_type(), format!("auth_{}", kind.as_str()));
        }
    }

    #[test]
    fn parses_known_kinds() {
        assert_eq!("retro".parse::<RoomKind>().unwrap(), RoomKind::Retro);
        assert!("battle".parse::<RoomKind>().is_err());
    }
}
