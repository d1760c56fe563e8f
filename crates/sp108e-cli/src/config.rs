//! Client configuration.
//!
//! Loaded from an optional YAML file; every field has a default, so an
//! empty file (or none at all) targets the controller's own access point.
//!
//! ```yaml
//! host: 10.0.0.42
//! port: 8189
//! connect_timeout_ms: 5000
//! read_timeout_ms: 2000
//! probe_unknown_silence: true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sp108e_protocol::{SessionConfig, DEFAULT_HOST, DEFAULT_PORT};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid YAML for [`ClientConfig`].
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Path that was read.
        path: String,
        /// Underlying error.
        source: serde_yaml::Error,
    },
}

/// Where and how to reach the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Controller address.
    pub host: String,
    /// Controller TCP port.
    pub port: u16,
    /// Connect deadline in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-reply deadline in milliseconds.
    pub read_timeout_ms: u64,
    /// Probe instead of failing when a command of unknown reply behavior
    /// stays silent.
    pub probe_unknown_silence: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 5000,
            read_timeout_ms: 2000,
            probe_unknown_silence: true,
        }
    }
}

impl ClientConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as null, not as an empty map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Load from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    /// `host:port` for connecting.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect deadline.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Session tunables derived from this config.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            probe_unknown_silence: self.probe_unknown_silence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.addr(), "192.168.4.1:8189");
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ClientConfig::from_yaml("host: 10.0.0.42\nread_timeout_ms: 500\n").unwrap();
        assert_eq!(config.host, "10.0.0.42");
        assert_eq!(config.port, 8189);
        assert_eq!(
            config.session_config().read_timeout,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ClientConfig::from_yaml("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(ClientConfig::from_yaml("port: not-a-number\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::load(Path::new("/nonexistent/sp108e.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
