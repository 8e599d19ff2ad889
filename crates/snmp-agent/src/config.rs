//! Agent configuration.
//!
//! Configuration comes from three layers, later ones winning:
//!
//! 1. Built-in defaults ([`AgentConfig::default`])
//! 2. An optional TOML file ([`AgentConfig::from_file`])
//! 3. Command-line flags and their environment fallbacks (applied by the
//!    binary through the `with_*` builders)
//!
//! ```toml
//! bind_addr = "0.0.0.0:1161"
//! max_connections = 64
//! read_timeout_ms = 10000
//! write_timeout_ms = 10000
//! max_message_size = 65536
//! seed = "/etc/snmp-agent/objects.toml"
//! ```

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use snmp_core::protocol::{MAX_MESSAGE_SIZE, MIN_MESSAGE_SIZE};
use thiserror::Error;

/// Unprivileged stand-in for the well-known SNMP port.
pub const DEFAULT_PORT: u16 = 1161;

/// Default per-connection read and write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default limit on concurrently served connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending setting.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Runtime settings for [`AgentServer`](crate::AgentServer).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,

    /// Maximum connections served at once. Further clients wait in the
    /// accept backlog.
    pub max_connections: usize,

    /// How long a connection may sit between or inside requests.
    pub read_timeout_ms: u64,

    /// How long writing one response may take.
    pub write_timeout_ms: u64,

    /// Largest message accepted from a manager and largest bulk response
    /// produced.
    pub max_message_size: usize,

    /// Seed file for the object table. The bundled table is used when unset.
    pub seed: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            read_timeout_ms: duration_ms(DEFAULT_TIMEOUT),
            write_timeout_ms: duration_ms(DEFAULT_TIMEOUT),
            max_message_size: MAX_MESSAGE_SIZE,
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Create a config listening on `bind_addr` with default settings.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise see
    /// [`AgentConfig::from_toml`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Set the listen address.
    #[must_use]
    pub const fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the maximum concurrent connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the maximum message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the seed file.
    #[must_use]
    pub fn with_seed(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed = Some(path.into());
        self
    }

    /// Read timeout as a [`Duration`].
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write timeout as a [`Duration`].
    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "max_connections",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "read_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "write_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(MIN_MESSAGE_SIZE..=MAX_MESSAGE_SIZE).contains(&self.max_message_size) {
            return Err(ConfigError::Invalid {
                field: "max_message_size",
                reason: format!(
                    "{} is outside {MIN_MESSAGE_SIZE}..={MAX_MESSAGE_SIZE}",
                    self.max_message_size
                ),
            });
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
