//! Runtime configuration types.

use std::time::Duration;

/// Selects error verbosity and request logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// `development` (any case) selects development; anything else is production.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    pub port: u16,
    pub jwt: JwtConfig,
}
