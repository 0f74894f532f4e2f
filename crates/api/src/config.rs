//! Process configuration read from the environment at startup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use shopdesk_infra::DEFAULT_BROADCAST_INTERVAL;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_DASHBOARD_INTERVAL_SECS: u64 = DEFAULT_BROADCAST_INTERVAL.as_secs();
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid SHOPDESK_BIND_ADDR '{value}': {reason}")]
    InvalidBindAddr { value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub dashboard_interval: Duration,
    pub send_timeout: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source (the environment in production, a map in tests).
    ///
    /// Unparsable numeric settings fall back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_addr =
            lookup("SHOPDESK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = SocketAddr::from_str(raw_addr.trim()).map_err(|e| {
            ConfigError::InvalidBindAddr {
                value: raw_addr.clone(),
                reason: e.to_string(),
            }
        })?;

        let database_url = lookup("DATABASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let db_max_connections =
            parse_or_default(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS, |v| *v > 0);
        let interval_secs = parse_or_default(
            &lookup,
            "DASHBOARD_INTERVAL_SECS",
            DEFAULT_DASHBOARD_INTERVAL_SECS,
            |v| *v > 0,
        );
        let send_timeout_ms = parse_or_default(
            &lookup,
            "DASHBOARD_SEND_TIMEOUT_MS",
            DEFAULT_SEND_TIMEOUT_MS,
            |v| *v > 0,
        );

        Ok(Self {
            bind_addr,
            database_url,
            db_max_connections,
            dashboard_interval: Duration::from_secs(interval_secs),
            send_timeout: Duration::from_millis(send_timeout_ms),
        })
    }
}

fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!(key, value = %raw, default = %default, "invalid setting; using default");
            default
        }
    }
}
