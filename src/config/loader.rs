//! Load configuration from the process environment.

use crate::config::types::{AppConfig, Environment, JwtConfig};
use crate::error::ConfigError;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/devcatalog";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_EXPIRES_IN: &str = "90d";

impl AppConfig {
    /// Read config from the environment (call `dotenvy::dotenv()` first to pick up `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or_default();

        let database_url = database_url_from_lookup(&lookup);

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let raw_expiry = lookup("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_EXPIRES_IN.into());
        let expires_in = parse_duration(&raw_expiry).ok_or(ConfigError::Invalid {
            var: "JWT_EXPIRES_IN",
            value: raw_expiry.clone(),
        })?;

        Ok(AppConfig {
            environment,
            database_url,
            port,
            jwt: JwtConfig { secret, expires_in },
        })
    }
}

/// `DATABASE_URL` (or the default) with `DATABASE_PASSWORD` substituted for `<PASSWORD>`.
pub fn database_url_from_lookup<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
    match lookup("DATABASE_PASSWORD") {
        Some(password) => url.replace("<PASSWORD>", &password),
        None => url,
    }
}

/// Database URL from the process environment; needs no other settings.
pub fn database_url_from_env() -> String {
    database_url_from_lookup(|key| std::env::var(key).ok())
}

/// Parse `<n>[s|m|h|d]`; a bare number is seconds. Zero is rejected.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((i, _)) => raw.split_at(i),
        None => (raw, "s"),
    };
    let n: u64 = digits.parse().ok().filter(|n| *n > 0)?;
    let secs = match unit {
        "s" => n,
        "m" => n.checked_mul(60)?,
        "h" => n.checked_mul(60 * 60)?,
        "d" => n.checked_mul(24 * 60 * 60)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}
