//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind host: {0}")]
    InvalidHost(String),

    #[error("Idle timeout must be at least 2 seconds")]
    IdleTimeoutTooShort,

    #[error("Write timeout must be non-zero and shorter than the idle timeout")]
    InvalidWriteTimeout,

    #[error("Outbound queue capacity must be between 1 and 65536")]
    InvalidQueueCapacity,

    #[error("Maximum frame size must be at least 1 KiB")]
    FrameSizeTooSmall,

    #[error("Session and guest cookies must use different names")]
    CookieNameCollision,

    #[error("Anonymous guests are not allowed in production")]
    AnonymousGuestsInProduction,
}
