//! In-memory identity resolver.
//!
//! Maps cookie values to users without an external session store. Used by
//! the development binary and the test suites.
//!
//! # Example
//!
//! ```ignore
//! let resolver = InMemoryIdentityResolver::new()
//!     .with_session("s-alice", RoomUser::registered(alice_id, "Alice"))
//!     .with_guest("g-bob", RoomUser::guest(bob_id, "Bob"));
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, RoomUser, UserId};
use crate::ports::IdentityResolver;

/// Cookie-value to user lookup held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryIdentityResolver {
    sessions: RwLock<HashMap<String, RoomUser>>,
    guests: RwLock<HashMap<String, RoomUser>>,
    /// Accept any non-empty guest token as a fresh guest identity.
    anonymous_guests: bool,
    /// Error returned by every validation, for failure testing.
    force_error: RwLock<Option<AuthError>>,
}

impl InMemoryIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session cookie value.
    pub fn with_session(self, token: impl Into<String>, user: RoomUser) -> Self {
        self.add_session(token, user);
        self
    }

    /// Registers a guest cookie value.
    pub fn with_guest(self, token: impl Into<String>, user: RoomUser) -> Self {
        self.add_guest(token, user);
        self
    }

    /// Treats unknown guest tokens as new guests whose id is the token.
    pub fn with_anonymous_guests(mut self, enabled: bool) -> Self {
        self.anonymous_guests = enabled;
        self
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        if let Ok(mut slot) = self.force_error.write() {
            *slot = Some(error);
        }
        self
    }

    pub fn add_session(&self, token: impl Into<String>, user: RoomUser) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(token.into(), user);
        }
    }

    pub fn add_guest(&self, token: impl Into<String>, user: RoomUser) {
        if let Ok(mut guests) = self.guests.write() {
            guests.insert(token.into(), user);
        }
    }

    /// Invalidates a session cookie value.
    pub fn revoke_session(&self, token: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(token);
        }
    }

    fn check_forced(&self) -> Result<(), AuthError> {
        let forced = self
            .force_error
            .read()
            .map_err(|_| AuthError::service_unavailable("identity store lock poisoned"))?;
        match forced.as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn lookup(table: &RwLock<HashMap<String, RoomUser>>, token: &str) -> Result<Option<RoomUser>, AuthError> {
        let table = table
            .read()
            .map_err(|_| AuthError::service_unavailable("identity store lock poisoned"))?;
        Ok(table.get(token).cloned())
    }

    fn anonymous_guest(token: &str) -> Result<RoomUser, AuthError> {
        let id = UserId::new(token).map_err(|_| AuthError::InvalidGuest)?;
        let short: String = token.chars().take(6).collect();
        Ok(RoomUser::guest(id, format!("Guest {short}")))
    }
}

#[async_trait]
impl IdentityResolver for InMemoryIdentityResolver {
    async fn validate_session(&self, token: &str) -> Result<RoomUser, AuthError> {
        self.check_forced()?;
        Self::lookup(&self.sessions, token)?.ok_or(AuthError::InvalidSession)
    }

    async fn validate_guest(&self, token: &str) -> Result<RoomUser, AuthError> {
        self.check_forced()?;
        if let Some(user) = Self::lookup(&self.guests, token)? {
            return Ok(user);
        }
        if self.anonymous_guests && !token.trim().is_empty() {
            return Self::anonymous_guest(token);
        }
        Err(AuthError::InvalidGuest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Credentials;

    fn alice() -> RoomUser {
        RoomUser::registered(UserId::new("alice").unwrap(), "Alice")
    }

    fn bob() -> RoomUser {
        RoomUser::guest(UserId::new("bob").unwrap(), "Bob")
    }

    #[tokio::test]
    async fn known_session_resolves() {
        let resolver = InMemoryIdentityResolver::new().with_session("s1", alice());
        assert_eq!(resolver.validate_session("s1").await.unwrap(), alice());
        assert_eq!(resolver.validate_session("s2").await, Err(AuthError::InvalidSession));
    }

    #[tokio::test]
    async fn revoked_session_is_invalid() {
        let resolver = InMemoryIdentityResolver::new().with_session("s1", alice());
        resolver.revoke_session("s1");
        assert!(resolver.validate_session("s1").await.is_err());
    }

    #[tokio::test]
    async fn unknown_guest_rejected_unless_anonymous_allowed() {
        let strict = InMemoryIdentityResolver::new().with_guest("g1", bob());
        assert_eq!(strict.validate_guest("g1").await.unwrap(), bob());
        assert_eq!(strict.validate_guest("g2").await, Err(AuthError::InvalidGuest));

        let lenient = InMemoryIdentityResolver::new().with_anonymous_guests(true);
        let guest = lenient.validate_guest("abcdef123").await.unwrap();
        assert!(guest.is_guest());
        assert_eq!(guest.id.as_str(), "abcdef123");
        assert_eq!(guest.name, "Guest abcdef");
    }

    #[tokio::test]
    async fn forced_error_applies_to_both_cookies() {
        let resolver = InMemoryIdentityResolver::new()
            .with_session("s1", alice())
            .with_error(AuthError::service_unavailable("down"));
        let err = resolver.resolve(&Credentials::session("s1")).await.unwrap_err();
        assert!(err.is_transient());
        assert!(resolver.validate_guest("g1").await.is_err());
    }
}
