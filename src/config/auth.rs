//! Authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Cookie names used to identify room connections
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Cookie carrying a registered user's session token
    #[serde(default = "default_session_cookie")]
    pub session_cookie_name: String,

    /// Cookie carrying a guest token
    #[serde(default = "default_guest_cookie")]
    pub guest_cookie_name: String,

    /// Accept unknown guest tokens as new guests (development only)
    #[serde(default)]
    pub allow_anonymous_guests: bool,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Anonymous guests are refused in production.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.session_cookie_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("SESSION_COOKIE_NAME"));
        }
        if self.guest_cookie_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("GUEST_COOKIE_NAME"));
        }
        if self.session_cookie_name == self.guest_cookie_name {
            return Err(ValidationError::CookieNameCollision);
        }
        if *environment == Environment::Production && self.allow_anonymous_guests {
            return Err(ValidationError::AnonymousGuestsInProduction);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: default_session_cookie(),
            guest_cookie_name: default_guest_cookie(),
            allow_anonymous_guests: false,
        }
    }
}

fn default_session_cookie() -> String {
    "session".to_string()
}

fn default_guest_cookie() -> String {
    "guest".to_string()
}
