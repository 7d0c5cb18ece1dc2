//! In-memory persistence adapters.

mod room_store;

pub use room_store::InMemoryRoomStore;
