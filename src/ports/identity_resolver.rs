//! Identity resolution port for room connections.
//!
//! Browsers authenticate the websocket upgrade with cookies issued by the
//! session collaborator. This port turns those cookie values into a
//! [`RoomUser`]; it never issues or refreshes credentials.
//!
//! # Precedence
//!
//! ```text
//! session cookie present ──► validate_session ──► Ok / Err (no fallback)
//!          │
//!          └─ absent ──► guest cookie present ──► validate_guest
//!                                 │
//!                                 └─ absent ──► MissingCredentials
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, Credentials, RoomUser};

/// Resolves upgrade-request credentials into a user.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::InvalidSession` for unknown or expired sessions
/// - Return `AuthError::InvalidGuest` for unknown guest tokens
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Validate a session cookie value.
    async fn validate_session(&self, token: &str) -> Result<RoomUser, AuthError>;

    /// Validate a guest cookie value.
    async fn validate_guest(&self, token: &str) -> Result<RoomUser, AuthError>;

    /// Resolve credentials, applying session-over-guest precedence.
    ///
    /// An invalid session cookie is a hard failure even when a valid guest
    /// cookie was also sent.
    async fn resolve(&self, credentials: &Credentials) -> Result<RoomUser, AuthError> {
        if let Some(token) = credentials.session_token.as_deref() {
            return self.validate_session(token).await;
        }
        match credentials.guest_token.as_deref() {
            Some(token) => self.validate_guest(token).await,
            None => Err(AuthError::MissingCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    struct FixedResolver;

    #[async_trait]
    impl IdentityResolver for FixedResolver {
        async fn validate_session(&self, token: &str) -> Result<RoomUser, AuthError> {
            match token {
                "good" => Ok(RoomUser::registered(UserId::new("alice").unwrap(), "Alice")),
                _ => Err(AuthError::InvalidSession),
            }
        }

        async fn validate_guest(&self, token: &str) -> Result<RoomUser, AuthError> {
            match token {
                "guest-1" => Ok(RoomUser::guest(UserId::new("g1").unwrap(), "Guest")),
                _ => Err(AuthError::InvalidGuest),
            }
        }
    }

    #[tokio::test]
    async fn session_cookie_wins_over_guest() {
        let credentials = Credentials {
            session_token: Some("good".into()),
            guest_token: Some("guest-1".into()),
        };
        let user = FixedResolver.resolve(&credentials).await.unwrap();
        assert_eq!(user.id.as_str(), "alice");
    }

    #[tokio::test]
    async fn invalid_session_does_not_fall_back_to_guest() {
        let credentials = Credentials {
            session_token: Some("expired".into()),
            guest_token: Some("guest-1".into()),
        };
        let result = FixedResolver.resolve(&credentials).await;
        assert_eq!(result, Err(AuthError::InvalidSession));
    }

    #[tokio::test]
    async fn guest_cookie_used_when_no_session() {
        let user = FixedResolver.resolve(&Credentials::guest("guest-1")).await.unwrap();
        assert!(user.is_guest());
    }

    #[tokio::test]
    async fn no_cookies_is_missing_credentials() {
        let result = FixedResolver.resolve(&Credentials::default()).await;
        assert_eq!(result, Err(AuthError::MissingCredentials));
    }

    #[test]
    fn identity_resolver_is_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn IdentityResolver>();
    }
}
