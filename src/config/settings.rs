//! Server settings read from the environment (and `.env`).

use crate::error::ConfigError;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// PostgreSQL URL; in-memory storage when unset.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub admin_config_path: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            admin_config_path: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Settings {
    /// Loads `.env` if present, then reads `DATABASE_URL`, `BIND_ADDR`,
    /// `ADMIN_CONFIG_PATH` and `MAX_BODY_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let max_body_bytes = match var("MAX_BODY_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| ConfigError::Load(format!("MAX_BODY_BYTES: {}", e)))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };
        Ok(Settings {
            database_url: var("DATABASE_URL"),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            admin_config_path: var("ADMIN_CONFIG_PATH").map(PathBuf::from),
            max_body_bytes,
        })
    }
}
