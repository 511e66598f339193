// Runtime configuration, read from the environment

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "dispatch.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite file (`DISPATCH_DB_PATH`)
    pub db_path: PathBuf,
    /// HTTP listen address (`DISPATCH_BIND_ADDR`)
    pub bind_addr: SocketAddr,
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or empty keys take their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let raw_addr = value("DISPATCH_BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = raw_addr
            .parse()
            .with_context(|| format!("Invalid DISPATCH_BIND_ADDR: {}", raw_addr))?;

        Ok(Config {
            db_path: PathBuf::from(value("DISPATCH_DB_PATH", DEFAULT_DB_PATH)),
            bind_addr,
            log_level: value("RUST_LOG", DEFAULT_LOG_LEVEL),
        })
    }
}
