use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_db_connections: u32,
    pub session_inactivity: time::Duration,
    /// Outbound payloads a live connection may have queued before new ones
    /// are dropped.
    pub connection_buffer: usize,
}

impl Config {
    /// Reads the process environment, falling back to a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Config {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://murmur.db".to_owned()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_owned()),
            max_db_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 16)?,
            session_inactivity: time::Duration::minutes(parsed(&lookup, "SESSION_INACTIVITY_MINUTES", 60)?),
            connection_buffer: parsed(&lookup, "CONNECTION_BUFFER", 64)?,
        })
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| anyhow!("{key}={raw:?} is invalid: {err}")),
    }
}
