//! Configuration types for the reconciler
//!
//! All fields have defaults, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main reconciler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DripConfig {
    /// Snapshot store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Gateway probing settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl DripConfig {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their defaults. The result is not validated.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;
        self.gateway.validate()?;
        Ok(())
    }
}

/// Snapshot store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the `*ipconfig-{n}.csv` files
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.base_path.as_os_str().is_empty() {
            return Err(crate::Error::config("Snapshot base path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
        }
    }
}

/// Gateway probing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Echo requests sent before a gateway is declared unreachable
    #[serde(default = "default_ping_attempts")]
    pub ping_attempts: u32,

    /// Pause after applying a configuration before probing again (in seconds)
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=10).contains(&self.ping_attempts) {
            return Err(crate::Error::config(format!(
                "Ping attempts must be between 1 and 10. Got: {}",
                self.ping_attempts
            )));
        }
        if self.settle_delay_secs > 300 {
            return Err(crate::Error::config(format!(
                "Settle delay must be at most 300 seconds. Got: {}",
                self.settle_delay_secs
            )));
        }
        Ok(())
    }

    /// Settle delay as a [`Duration`]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ping_attempts: default_ping_attempts(),
            settle_delay_secs: default_settle_delay_secs(),
        }
    }
}

#[cfg(windows)]
fn default_base_path() -> PathBuf {
    PathBuf::from(r"c:\")
}

#[cfg(not(windows))]
fn default_base_path() -> PathBuf {
    PathBuf::from("/var/lib/drip")
}

fn default_ping_attempts() -> u32 {
    2
}

fn default_settle_delay_secs() -> u64 {
    10
}
