//! Configuration records for the server and the client
//!
//! Both sides load from one TOML file (`[server]` and `[client]` tables),
//! get overridden by CLI flags, then are validated exactly once before any
//! socket is touched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checksum::ChecksumType;
use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::protocol::{
    timeouts, DEFAULT_CHUNK_SIZE, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_READ_BUFFER, DEFAULT_TOP_K,
};
use crate::protocol_core::{validate_chunk_size, validate_file_path};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    /// 0 binds an ephemeral port
    pub port: u16,
    pub chunk_size: usize,
    pub file_path: PathBuf,
    pub checksum: ChecksumType,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            file_path: PathBuf::new(),
            checksum: ChecksumType::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16, chunk_size: usize, file_path: impl Into<PathBuf>) -> Self {
        ServerConfig {
            host: host.into(),
            port,
            chunk_size,
            file_path: file_path.into(),
            checksum: ChecksumType::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        validate_chunk_size(self.chunk_size)?;
        validate_file_path(&self.file_path)
    }

    pub fn bind_addr(&self) -> String {
        Endpoint::new(self.host.clone(), self.port).connect_addr()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub endpoints: Vec<Endpoint>,
    pub top_k: usize,
    pub connect_timeout_ms: u64,
    /// Bound on one endpoint's whole session: connect, header and body
    pub transfer_timeout_ms: u64,
    pub read_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            endpoints: Vec::new(),
            top_k: DEFAULT_TOP_K,
            connect_timeout_ms: timeouts::CONNECT_MS,
            transfer_timeout_ms: timeouts::TRANSFER_MS,
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }
}

impl ClientConfig {
    pub fn with_endpoints(endpoints: Vec<Endpoint>) -> Self {
        ClientConfig {
            endpoints,
            ..ClientConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        if self.top_k == 0 {
            return Err(ConfigError::Zero { field: "top_k" });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "connect_timeout_ms",
            });
        }
        if self.transfer_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "transfer_timeout_ms",
            });
        }
        if self.read_buffer == 0 {
            return Err(ConfigError::Zero {
                field: "read_buffer",
            });
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

/// On-disk layout: both tables optional, missing fields take defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load when a path is given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
