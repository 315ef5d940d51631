use std::{env, fmt::Display, str::FromStr};

use chrono::{FixedOffset, Offset, Utc};
use log::{info, warn};

use crate::timefmt;

/// Upper bound for `RESET_TOKEN_TTL_SECS`: one week.
pub const MAX_RESET_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "local" => Ok(Self::Memory),
            other => Err(format!("Unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub admin_id: String,
    pub admin_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub pool_size: u32,
    pub utc_offset: FixedOffset,
    pub reset_token_ttl_secs: i64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            backend: StoreBackend::Memory,
            database_url: None,
            pool_size: 10,
            utc_offset: Utc.fix(),
            reset_token_ttl_secs: 3600,
            bootstrap_admin: None,
        }
    }
}

impl Config {
    /// Reads settings from the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let database_url = var("DATABASE_URL");

        let backend = match var("STORE_BACKEND") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "STORE_BACKEND",
                reason,
            })?,
            None if database_url.is_some() => StoreBackend::Postgres,
            None => StoreBackend::Memory,
        };

        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let utc_offset = match var("APP_UTC_OFFSET") {
            Some(raw) => timefmt::parse_utc_offset(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "APP_UTC_OFFSET",
                reason: format!("`{}` is not an offset like +08:00", raw),
            })?,
            None => defaults.utc_offset,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: try_load("PORT", defaults.port)?,
            backend,
            database_url,
            pool_size: try_load("DB_POOL_SIZE", defaults.pool_size)?,
            utc_offset,
            reset_token_ttl_secs: check_reset_token_ttl(try_load(
                "RESET_TOKEN_TTL_SECS",
                defaults.reset_token_ttl_secs,
            )?)?,
            bootstrap_admin: bootstrap_admin(),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn check_reset_token_ttl(ttl: i64) -> Result<i64, ConfigError> {
    if (1..=MAX_RESET_TOKEN_TTL_SECS).contains(&ttl) {
        Ok(ttl)
    } else {
        Err(ConfigError::Invalid {
            key: "RESET_TOKEN_TTL_SECS",
            reason: format!("{} is outside 1..={}", ttl, MAX_RESET_TOKEN_TTL_SECS),
        })
    }
}

fn bootstrap_admin() -> Option<BootstrapAdmin> {
    let admin_id = var("BOOTSTRAP_ADMIN_ID")?;
    let Some(password) = var("BOOTSTRAP_ADMIN_PASSWORD") else {
        warn!("BOOTSTRAP_ADMIN_ID is set without BOOTSTRAP_ADMIN_PASSWORD; skipping seed admin");
        return None;
    };
    Some(BootstrapAdmin {
        admin_name: var("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| admin_id.clone()),
        email: var("BOOTSTRAP_ADMIN_EMAIL").unwrap_or_else(|| format!("{}@localhost", admin_id)),
        admin_id,
        password,
    })
}
