//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the room hub to the outside world:
//! - `auth` - identity resolution from session and guest cookies
//! - `memory` - in-process room directory and state storage
//! - `websocket` - upgrade handler, hub, pumps and event bridge

pub mod auth;
pub mod memory;
pub mod websocket;

pub use auth::InMemoryIdentityResolver;
pub use memory::InMemoryRoomStore;
pub use websocket::{room_router, ApiEventBridge, ChannelPorts, Hub, HubHandle, RoomChannel};
