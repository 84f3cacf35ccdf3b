//! Server configuration.
//!
//! Read from environment variables at startup:
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `127.0.0.1` |
//! | `PORT` | `5000` |
//! | `DATABASE_PATH` | `taskboard.db` |
//! | `JWT_SECRET` | required unless `DEV_MODE=true` |
//! | `JWT_TTL_HOURS` | `1` |
//! | `PASSWORD_ITERATIONS` | `100000` |
//! | `CORS_ORIGIN` | unset (same-origin only; permissive in dev mode) |
//! | `DEV_MODE` | `false` |
//! | `LOG_LEVEL` | `info` (overridden by `RUST_LOG`) |

use std::path::PathBuf;

use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("JWT_SECRET must be set when DEV_MODE is off")]
    MissingJwtSecret,
}

/// Token signing settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub password_iterations: u32,
    /// Secret was generated at startup and dies with the process.
    pub ephemeral_secret: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub auth: AuthConfig,
    pub cors_origin: Option<String>,
    /// Relaxes startup checks: ephemeral JWT secret, permissive CORS.
    pub dev_mode: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dev_mode = match var("DEV_MODE") {
            Some(v) => parse_bool("DEV_MODE", &v)?,
            None => false,
        };

        let (jwt_secret, ephemeral) = match var("JWT_SECRET") {
            Some(secret) => (secret, false),
            None if dev_mode => (ephemeral_secret(), true),
            None => return Err(ConfigError::MissingJwtSecret),
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or("PORT", var("PORT"), 5000)?,
            database_path: var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("taskboard.db")),
            auth: AuthConfig {
                jwt_secret,
                jwt_ttl_hours: parse_or("JWT_TTL_HOURS", var("JWT_TTL_HOURS"), 1)?,
                password_iterations: parse_or(
                    "PASSWORD_ITERATIONS",
                    var("PASSWORD_ITERATIONS"),
                    100_000,
                )?,
                ephemeral_secret: ephemeral,
            },
            cors_origin: var("CORS_ORIGIN"),
            dev_mode,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                var: name,
                reason: e.to_string(),
                value,
            }),
        },
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var: name,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn ephemeral_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
