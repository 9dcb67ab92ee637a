//! Server configuration.

use std::path::PathBuf;

use thiserror::Error;
use twowaykv::{IndexConfig, Location};

/// Port used when neither a flag nor an environment variable sets one.
pub const DEFAULT_PORT: u16 = 8080;

/// Lowest port the server agrees to bind.
pub const MIN_PORT: u16 = 1000;

/// Address bound when none is given.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Errors in the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `PORT` was set to something that is not a port number.
    #[error("invalid PORT '{0}': not a port number")]
    InvalidPort(String),

    /// The port is below [`MIN_PORT`].
    #[error("port {0} is outside the allowed range 1000..=65535")]
    PortOutOfRange(u16),
}

/// Settings for [`run`](crate::server::run).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Storage root holding `k2v/` and `v2k/`.
    pub data_dir: PathBuf,
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Exclusive upper bound of allocated values.
    pub max_value: u64,
}

impl ServerConfig {
    /// The `host:port` string to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The index configuration derived from these settings.
    pub fn index_config(&self) -> IndexConfig {
        let mut config = IndexConfig::new(Location::Directory(self.data_dir.clone()));
        config.max_value = self.max_value;
        config
    }
}

/// Apply the `PORT` override to the configured port.
///
/// Hosting platforms set `PORT`; when present it wins over `--port` and
/// `GRAPH_DB_STORE_PORT`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if `PORT` does not parse or the port is below
/// [`MIN_PORT`].
pub fn resolve_port(configured: u16, port_env: Option<&str>) -> Result<u16, ConfigError> {
    let port = match port_env.map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw.to_string()))?,
        None => configured,
    };

    if port < MIN_PORT {
        return Err(ConfigError::PortOutOfRange(port));
    }
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_env_overrides() {
        assert_eq!(resolve_port(8080, Some("9090")).expect("valid"), 9090);
        assert_eq!(resolve_port(8080, None).expect("valid"), 8080);
        assert_eq!(resolve_port(8080, Some("  ")).expect("valid"), 8080);
    }

    #[test]
    fn test_port_validation() {
        assert!(matches!(resolve_port(8080, Some("80")), Err(ConfigError::PortOutOfRange(80))));
        assert!(matches!(resolve_port(999, None), Err(ConfigError::PortOutOfRange(999))));
        assert!(matches!(resolve_port(8080, Some("http")), Err(ConfigError::InvalidPort(_))));
        assert!(matches!(resolve_port(8080, Some("70000")), Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn test_index_config() {
        let config = ServerConfig {
            data_dir: PathBuf::from("/data"),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_value: 1000,
        };
        assert_eq!(config.addr(), "0.0.0.0:8080");

        let index = config.index_config();
        assert_eq!(index.location, Location::Directory(PathBuf::from("/data")));
        assert_eq!(index.max_value, 1000);
    }
}
