//! Layered configuration for the hub process.
//!
//! Values come from the process environment (after an optional `.env` file)
//! under the `ROOMHUB` prefix, with `__` between nesting levels:
//!
//! | Variable | Field |
//! |---|---|
//! | `ROOMHUB__SERVER__PORT` | `server.port` |
//! | `ROOMHUB__HUB__IDLE_TIMEOUT_SECS` | `hub.idle_timeout_secs` |
//! | `ROOMHUB__AUTH__ALLOW_ANONYMOUS_GUESTS` | `auth.allow_anonymous_guests` |
//!
//! ```no_run
//! use roomhub::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("binding {}", config.server.bind_addr()?);
//! # Ok(())
//! # }
//! ```

mod auth;
mod error;
mod hub;
mod server;

pub use auth::AuthConfig;
pub use error::{ConfigError, ValidationError};
pub use hub::HubConfig;
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "ROOMHUB";
const ENV_SEPARATOR: &str = "__";

/// Every section falls back to its defaults, so an empty environment
/// yields a runnable development setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub hub: HubConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Reads `.env` if present, then the `ROOMHUB__*` variables.
    ///
    /// # Errors
    ///
    /// `ConfigError::LoadError` when a variable does not parse into its field.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let source = config::Environment::default()
            .prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true);

        Ok(config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?)
    }

    /// Cross-section checks run once at startup, before anything binds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.hub.validate()?;
        self.auth.validate(&self.server.environment)
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    pub fn log_format(&self) -> LogFormat {
        self.server.environment.log_format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "ROOMHUB__SERVER__PORT",
        "ROOMHUB__SERVER__ENVIRONMENT",
        "ROOMHUB__HUB__IDLE_TIMEOUT_SECS",
        "ROOMHUB__AUTH__ALLOW_ANONYMOUS_GUESTS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn empty_environment_is_a_valid_development_setup() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.hub.outbound_capacity, 256);
        assert_eq!(config.auth.session_cookie_name, "session");
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_variables_override_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ROOMHUB__SERVER__PORT", "3000");
        env::set_var("ROOMHUB__HUB__IDLE_TIMEOUT_SECS", "30");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.hub.idle_timeout_secs, 30);
        assert_eq!(config.hub.outbound_capacity, 256);
    }

    #[test]
    fn unparseable_port_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ROOMHUB__SERVER__PORT", "eighty");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn production_rejects_anonymous_guests() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ROOMHUB__SERVER__ENVIRONMENT", "production");
        env::set_var("ROOMHUB__AUTH__ALLOW_ANONYMOUS_GUESTS", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(
            config.validate(),
            Err(ValidationError::AnonymousGuestsInProduction)
        );
    }
}
