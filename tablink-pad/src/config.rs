//! Pad client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tablink_core::{DeviceDescriptor, EngineConfig};

/// Top-level configuration for the pad client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PadConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Geometry reported to the host in the handshake.
    pub device: DeviceDescriptor,
    /// Session engine timings.
    pub engine: EngineConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host address (`ip`, `ip:port` or host name). Empty means the
    /// last peer recorded in the state file.
    pub host_address: String,
    /// Where the last successfully used peer is remembered.
    pub state_file: String,
    /// Reconnect after the session is lost or the handshake fails.
    pub auto_reconnect: bool,
    /// Pause before a reconnect attempt in milliseconds.
    pub reconnect_delay_ms: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host_address: String::new(),
            state_file: "tablink-pad.state.toml".into(),
            auto_reconnect: false,
            reconnect_delay_ms: 2000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl NetworkConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl PadConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────
