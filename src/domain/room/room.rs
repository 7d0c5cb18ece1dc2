//! Room metadata and membership rows as seen by the hub.
//!
//! The hub never stores these; they are read from the room directory on
//! admission and on every membership change.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::domain::foundation::{RoomId, RoomUser, UserId, UserKind};

/// Room metadata needed for admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,

    /// Shared secret required from first-time joiners.
    #[serde(skip_serializing)]
    pub join_code: Option<String>,

    /// Shared secret that lets a member promote themselves to facilitator.
    #[serde(skip_serializing)]
    pub facilitator_code: Option<String>,
}

impl Room {
    /// Creates an ungated room.
    pub fn new(id: RoomId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            join_code: None,
            facilitator_code: None,
        }
    }

    /// Sets the join code.
    pub fn with_join_code(mut self, code: impl Into<String>) -> Self {
        self.join_code = Some(code.into());
        self
    }

    /// Sets the facilitator code.
    pub fn with_facilitator_code(mut self, code: impl Into<String>) -> Self {
        self.facilitator_code = Some(code.into());
        self
    }

    /// True when first-time joiners must answer the join-code challenge.
    pub fn requires_join_code(&self) -> bool {
        self.join_code.as_deref().is_some_and(|code| !code.is_empty())
    }

    /// Compares a join-code attempt in constant time.
    pub fn join_code_matches(&self, attempt: &str) -> bool {
        secret_matches(self.join_code.as_deref(), attempt)
    }

    /// Compares a facilitator-code attempt in constant time.
    pub fn facilitator_code_matches(&self, attempt: &str) -> bool {
        secret_matches(self.facilitator_code.as_deref(), attempt)
    }
}

fn secret_matches(secret: Option<&str>, attempt: &str) -> bool {
    match secret {
        Some(secret) if !secret.is_empty() => secret.as_bytes().ct_eq(attempt.as_bytes()).into(),
        _ => false,
    }
}

/// Persisted membership row for a (room, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Membership {
    /// A connection for this user is currently admitted.
    pub active: bool,
    /// The user left permanently; cleared on next admission.
    pub abandoned: bool,
}

/// One entry of the member list broadcast on join/leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: UserId,
    pub name: String,
    pub kind: UserKind,
    pub active: bool,
    pub abandoned: bool,
    pub facilitator: bool,
}

impl Member {
    /// Builds a member entry from a resolved user.
    pub fn from_user(user: &RoomUser, membership: Membership, facilitator: bool) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            kind: user.kind,
            active: membership.active,
            abandoned: membership.abandoned,
            facilitator,
        }
    }
}
