//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,
    InvalidEventValue,

    // Not found errors
    RoomNotFound,
    MembershipNotFound,
    ItemNotFound,

    // State errors
    InvalidStateTransition,
    VotingClosed,

    // Authorization errors
    Unauthorized,
    Forbidden,

    // Infrastructure errors
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// Wire-style name, e.g. `ROOM_NOT_FOUND`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidEventValue => "INVALID_EVENT_VALUE",
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::MembershipNotFound => "MEMBERSHIP_NOT_FOUND",
            ErrorCode::ItemNotFound => "ITEM_NOT_FOUND",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::VotingClosed => "VOTING_CLOSED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Failures of a collaborator rather than of the member's request.
    pub fn is_infrastructure(self) -> bool {
        matches!(self, ErrorCode::DatabaseError | ErrorCode::InternalError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard domain error with code, message, and optional details.
///
/// This is the only error type that crosses port boundaries.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a room-not-found error.
    pub fn room_not_found(room_id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::RoomNotFound, "Room not found").with_detail("room_id", room_id.to_string())
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Creates an error for an event value that could not be decoded or is out of bounds.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidEventValue, message)
    }

    /// Creates an item-not-found error.
    pub fn item_not_found(item: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ItemNotFound, "Item not found").with_detail("item_id", item.to_string())
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        DomainError::new(ErrorCode::ValidationFailed, err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::invalid_value(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("room_id");
        assert_eq!(format!("{}", err), "Field 'room_id' cannot be empty");
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::RoomNotFound, "Room not found");
        assert_eq!(format!("{}", err), "[ROOM_NOT_FOUND] Room not found");
    }

    #[test]
    fn only_collaborator_failures_are_infrastructure() {
        assert!(ErrorCode::DatabaseError.is_infrastructure());
        assert!(ErrorCode::InternalError.is_infrastructure());
        assert!(!ErrorCode::Forbidden.is_infrastructure());
        assert!(!ErrorCode::VotingClosed.is_infrastructure());
    }

    #[test]
    fn room_not_found_carries_room_detail() {
        let err = DomainError::room_not_found("r1");
        assert_eq!(err.code(), ErrorCode::RoomNotFound);
        assert_eq!(err.details.get("room_id"), Some(&"r1".to_string()));
    }

    #[test]
    fn json_errors_become_invalid_event_values() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: DomainError = json_err.into();
        assert_eq!(err.code, ErrorCode::InvalidEventValue);
    }

    #[test]
    fn validation_errors_convert_to_domain_errors() {
        let err: DomainError = ValidationError::invalid_format("points", "not allowed").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("points"));
    }
}
