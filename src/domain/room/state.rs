//! Contract shared by the per-domain room state models.

use serde_json::Value;

/// Domain state owned by one room.
///
/// `view` is what a freshly admitted client receives in its `init`
/// envelope, so it must not leak anything members should not see yet
/// (for example unrevealed votes).
pub trait RoomState: Default + Clone + Send + Sync + 'static {
    /// Client-facing projection of the state.
    fn view(&self) -> Value;
}
