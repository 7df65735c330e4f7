//! Device configuration.
//!
//! Loaded from an optional YAML file; command line flags override it.
//!
//! ```yaml
//! listen: 127.0.0.1:4800
//! debug: true
//! update_capacity: 64
//! poll_interval_ms: 5
//! write_timeout_ms: 1000
//! messenger:
//!   identifier: "Arn."
//!   field_separators: ":\r"
//!   line_terminator: true
//! ```

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use iocp_messenger::MessengerConfig;
use serde::{Deserialize, Serialize};

use crate::error::DeviceResult;

/// Default TCP port the device listens on.
pub const DEFAULT_PORT: u16 = 4800;

/// Default number of pending updates held between loop iterations.
pub const DEFAULT_UPDATE_CAPACITY: usize = 64;

/// Configuration for the device application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Address the device accepts host connections on.
    pub listen: SocketAddr,
    /// Wire format of the link.
    pub messenger: MessengerConfig,
    /// Maximum number of pending updates.
    pub update_capacity: usize,
    /// Send `Stat` diagnostics to the host.
    pub debug: bool,
    /// Sleep between loop iterations, in milliseconds.
    pub poll_interval_ms: u64,
    /// How long a reply may wait for a host that stops reading, in
    /// milliseconds. The session is dropped once it expires.
    pub write_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            messenger: MessengerConfig::default(),
            update_capacity: DEFAULT_UPDATE_CAPACITY,
            debug: false,
            poll_interval_ms: 5,
            write_timeout_ms: 1000,
        }
    }
}

impl DeviceConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> DeviceResult<Self> {
        let config: DeviceConfig = serde_yaml::from_str(yaml)?;
        config.messenger.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> DeviceResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}
