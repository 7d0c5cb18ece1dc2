//! Room vocabulary shared by the hub and every room domain.
//!
//! - `envelope` - the `{type, value, userId}` wire unit
//! - `close_code` - close code taxonomy (4001-4005)
//! - `kind` - the four room domains
//! - `room` - room metadata, membership rows and member lists
//! - `state` - the contract every domain state model implements

mod close_code;
mod envelope;
mod kind;
#[allow(clippy::module_inception)]
mod room;
mod state;

pub use close_code::CloseCode;
pub use envelope::{
    Envelope, Payload, INIT, JOIN_CODE_INCORRECT, JOIN_CODE_REQUIRED, MEMBER_JOINED, MEMBER_LEFT,
};
pub use kind::RoomKind;
pub use room::{Member, Membership, Room};
pub use state::RoomState;
