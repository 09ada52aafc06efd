//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ServerConfig {
            bind_addr: lookup("VENDORYA_BIND_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("VENDORYA_BIND_ADDR".to_string()))?,

            database_path: lookup("VENDORYA_DATABASE_PATH").unwrap_or_else(|| "./vendorya.db".to_string()),

            db_max_connections: lookup("VENDORYA_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("VENDORYA_DB_MAX_CONNECTIONS".to_string()))?,

            log_level: lookup("VENDORYA_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("VENDORYA_DB_MAX_CONNECTIONS".to_string()));
        }
        if config.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("VENDORYA_DATABASE_PATH".to_string()));
        }

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.database_path, "./vendorya.db");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = load(&[("VENDORYA_BIND_ADDR", "127.0.0.1:9000"), ("VENDORYA_DB_MAX_CONNECTIONS", "8")]).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.db_max_connections, 8);

        assert!(matches!(
            load(&[("VENDORYA_BIND_ADDR", "nowhere")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("VENDORYA_DB_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
