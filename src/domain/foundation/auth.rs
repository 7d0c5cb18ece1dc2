//! Authentication types for the domain layer.
//!
//! These types represent a user whose identity has been resolved from
//! request credentials. They have **no transport dependencies** - the
//! `IdentityResolver` port populates them from whatever session store
//! issued the cookies.
//!
//! # Precedence
//!
//! A session cookie, when present, is authoritative: an invalid session
//! cookie is a hard failure and never falls back to the guest cookie.
//! The guest cookie is consulted only when no session cookie was sent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::UserId;

/// How the user's identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    /// Registered account resolved from a session cookie.
    Registered,
    /// Guest identity resolved from a guest cookie.
    Guest,
}

/// A user admitted (or about to be admitted) into a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUser {
    pub id: UserId,
    pub name: String,
    pub kind: UserKind,
}

impl RoomUser {
    /// Creates a registered user.
    pub fn registered(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: UserKind::Registered,
        }
    }

    /// Creates a guest user.
    pub fn guest(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: UserKind::Guest,
        }
    }

    /// Returns true for guest identities.
    pub fn is_guest(&self) -> bool {
        self.kind == UserKind::Guest
    }
}

/// Raw credentials extracted from an upgrade request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Value of the session cookie, if one was sent.
    pub session_token: Option<String>,
    /// Value of the guest cookie, if one was sent.
    pub guest_token: Option<String>,
}

impl Credentials {
    /// Credentials carrying only a session cookie.
    pub fn session(token: impl Into<String>) -> Self {
        Self {
            session_token: Some(token.into()),
            guest_token: None,
        }
    }

    /// Credentials carrying only a guest cookie.
    pub fn guest(token: impl Into<String>) -> Self {
        Self {
            session_token: None,
            guest_token: Some(token.into()),
        }
    }

    /// Returns true when neither cookie was sent.
    pub fn is_empty(&self) -> bool {
        self.session_token.is_none() && self.guest_token.is_none()
    }
}

/// Authentication errors that can occur during identity resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No credentials were presented at all.
    #[error("No credentials presented")]
    MissingCredentials,

    /// The session cookie is unknown, malformed, or expired.
    #[error("Invalid or expired session")]
    InvalidSession,

    /// The guest cookie does not resolve to a guest user.
    #[error("Invalid guest identity")]
    InvalidGuest,

    /// The identity service could not be reached.
    #[error("Identity service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}
