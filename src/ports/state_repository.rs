//! Per-domain room state persistence port.
//!
//! Handlers never read-modify-write state themselves. They hand the
//! repository a change closure that runs against the current state while
//! the repository holds its lock, so two concurrent events on the same
//! room cannot lose each other's updates.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::{DomainError, RoomId};
use crate::domain::room::RoomState;

/// A state mutation producing the JSON value to broadcast.
///
/// Returning `Err` leaves the stored state untouched.
pub type StateChange<S> = Box<dyn FnOnce(&mut S) -> Result<Value, DomainError> + Send>;

/// Typed access to one domain's room state.
#[async_trait]
pub trait StateRepository<S: RoomState>: Send + Sync {
    /// Current state of the room, or the default state if none is stored.
    async fn load(&self, room_id: &RoomId) -> Result<S, DomainError>;

    /// Applies `change` atomically and returns its output.
    async fn modify(&self, room_id: &RoomId, change: StateChange<S>) -> Result<Value, DomainError>;
}

/// Type-erased view of a room's state, used for the `init` snapshot.
#[async_trait]
pub trait RoomStateReader: Send + Sync {
    async fn state_view(&self, room_id: &RoomId) -> Result<Value, DomainError>;
}
