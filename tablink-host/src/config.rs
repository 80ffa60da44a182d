//! Configuration for the host service.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tablink_core::{DEFAULT_PORT, HostBehavior};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Synthetic screen stream settings.
    pub screen: ScreenConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind the UDP socket on.
    pub listen_address: IpAddr,
    /// UDP port pads connect to.
    pub listen_port: u16,
    /// Reply to pad heartbeats. Disable to exercise the pad's loss path.
    pub answer_pings: bool,
}

/// Synthetic screen stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Stream frames once a pad has connected.
    pub stream_frames: bool,
    pub width: u32,
    pub height: u32,
    /// Target frames per second.
    pub fps: u8,
    /// zstd level (1 = fastest).
    pub compression_level: i32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: DEFAULT_PORT,
            answer_pings: true,
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            stream_frames: false,
            width: 320,
            height: 200,
            fps: 30,
            compression_level: 1,
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

// ── Loading ──────────────────────────────────────────────────────

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
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

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.network.listen_address, self.network.listen_port)
    }

    pub fn behavior(&self) -> HostBehavior {
        HostBehavior {
            ack_after: Some(1),
            answer_pings: self.network.answer_pings,
        }
    }

    /// Time between streamed frames.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / u32::from(self.screen.fps.clamp(1, 60))
    }
}

// ── Tests ────────────────────────────────────────────────────────
