//! Room directory port: room metadata, membership rows and roles.
//!
//! The hub consults the directory during admission and teardown, and the
//! domain handlers use it for role checks. The directory owns its own
//! concurrency safety; the hub never caches what it returns.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, RoomId, RoomUser, UserId};
use crate::domain::room::{Member, Membership, Room};

/// Lookup and mutation of persisted room membership.
///
/// # Contract
///
/// - `get_room` returns `ErrorCode::RoomNotFound` for unknown rooms
/// - `get_membership` returns `Ok(None)` when the user has never joined
/// - any other failure uses `ErrorCode::DatabaseError`
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn get_room(&self, room_id: &RoomId) -> Result<Room, DomainError>;

    /// Membership row for the pair, or `None` for first-time joiners.
    async fn get_membership(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError>;

    /// Marks the user active or inactive, creating the row if absent.
    ///
    /// Marking a user active clears a previous abandoned flag.
    async fn set_membership_active(
        &self,
        room_id: &RoomId,
        user: &RoomUser,
        active: bool,
    ) -> Result<(), DomainError>;

    /// Records that the user left the room permanently.
    async fn abandon_membership(&self, room_id: &RoomId, user_id: &UserId)
        -> Result<(), DomainError>;

    /// Whether the user holds an elevated role (facilitator/leader).
    async fn authorize_elevated(&self, room_id: &RoomId, user_id: &UserId)
        -> Result<bool, DomainError>;

    /// Grants the elevated role.
    async fn promote_facilitator(&self, room_id: &RoomId, user_id: &UserId)
        -> Result<(), DomainError>;

    /// Every member with a membership row, in join order.
    async fn members(&self, room_id: &RoomId) -> Result<Vec<Member>, DomainError>;
}
