//! Domain event handlers, one dispatch table per room kind.

pub mod checkin;
pub mod poker;
pub mod retro;
pub mod shared;
pub mod storyboard;

pub use shared::DomainPorts;
