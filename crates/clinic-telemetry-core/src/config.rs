//! Client configuration.
//!
//! Layered as defaults, then an optional JSON file, then environment
//! variables. Command-line flags are applied last by the caller.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::DOCTOR_ROLE;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9000;

pub const ENV_HOST: &str = "CLINIC_TELEMETRY_HOST";
pub const ENV_PORT: &str = "CLINIC_TELEMETRY_PORT";
pub const ENV_READ_TIMEOUT: &str = "CLINIC_TELEMETRY_READ_TIMEOUT_SECS";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where and how to connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Role announced in the handshake
    pub role: String,
    pub connect_timeout_secs: u64,
    /// `None` means reads block until the server answers
    pub read_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            role: DOCTOR_ROLE.to_string(),
            connect_timeout_secs: 5,
            read_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> ConfigResult<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> ConfigResult<Self> {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_PORT,
                    value: port.clone(),
                })?;
        }
        if let Some(secs) = lookup(ENV_READ_TIMEOUT) {
            let parsed: u64 = secs.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_READ_TIMEOUT,
                value: secs.clone(),
            })?;
            self.read_timeout_secs = (parsed > 0).then_some(parsed);
        }
        Ok(self)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}
