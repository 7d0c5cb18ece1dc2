//! Ports - Interfaces for external collaborators.
//!
//! The hub and the domain handlers reach persistence and identity only
//! through these traits. Adapters implement them.
//!
//! - `IdentityResolver` - Cookie credentials to room user
//! - `RoomDirectory` - Room metadata, membership rows, elevated roles
//! - `StateRepository` - Atomic per-domain state changes
//! - `RoomStateReader` - Type-erased state view for `init` snapshots

mod identity_resolver;
mod room_directory;
mod state_repository;

pub use identity_resolver::IdentityResolver;
pub use room_directory::RoomDirectory;
pub use state_repository::{RoomStateReader, StateChange, StateRepository};
