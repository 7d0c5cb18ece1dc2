//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types that form the
//! vocabulary shared by every room domain.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, Credentials, RoomUser, UserKind};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ItemId, RoomId, UserId};
pub use timestamp::Timestamp;
