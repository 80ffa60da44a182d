//! Engine timing and network configuration.
//!
//! Every constant the session engine relies on lives here so that tests
//! (and the binaries' TOML files) can shrink or stretch them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::frame::DEFAULT_MAX_FRAME_BYTES;

/// Default UDP port the host listens on.
pub const DEFAULT_PORT: u16 = 9999;

/// Configuration for [`Engine`](crate::session::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Port used when the connect address does not carry one.
    pub default_port: u16,
    /// DeviceInfoRequest attempts before giving up.
    pub handshake_attempts: u32,
    /// Wait between DeviceInfoRequest attempts (milliseconds, ≥ 500).
    pub handshake_interval_ms: u64,
    /// Period of the heartbeat monitor (milliseconds).
    pub heartbeat_interval_ms: u64,
    /// Silence after which the peer is declared dead (milliseconds).
    pub heartbeat_timeout_ms: u64,
    /// How long a single receive may block before the dispatcher loops.
    pub receive_poll_ms: u64,
    /// Minimum spacing of accepted Move/Hover samples (milliseconds).
    pub sample_interval_ms: u64,
    /// Largest decompressed frame accepted from the host (bytes).
    pub max_frame_bytes: usize,
    /// Frames waiting for reconstruction before new ones are dropped.
    pub frame_queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            handshake_attempts: 5,
            handshake_interval_ms: 500,
            heartbeat_interval_ms: 3000,
            heartbeat_timeout_ms: 10_000,
            receive_poll_ms: 500,
            sample_interval_ms: 8,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            frame_queue_depth: 4,
        }
    }
}

impl EngineConfig {
    pub fn handshake_interval(&self) -> Duration {
        Duration::from_millis(self.handshake_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn receive_poll(&self) -> Duration {
        Duration::from_millis(self.receive_poll_ms.max(1))
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Clamp values that would break the session engine.
    ///
    /// At least one handshake attempt is made, the heartbeat timer never
    /// spins and the frame queue can hold a frame.
    pub fn sanitized(mut self) -> Self {
        self.handshake_attempts = self.handshake_attempts.max(1);
        self.heartbeat_interval_ms = self.heartbeat_interval_ms.max(1);
        self.receive_poll_ms = self.receive_poll_ms.max(1);
        self.frame_queue_depth = self.frame_queue_depth.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.default_port, 9999);
        assert_eq!(cfg.handshake_attempts, 5);
        assert_eq!(cfg.handshake_interval(), Duration::from_millis(500));
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(3));
        assert_eq!(cfg.heartbeat_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.sample_interval(), Duration::from_millis(8));
        assert_eq!(cfg.max_frame_bytes, 7680 * 4320 * 4);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg: EngineConfig = toml::from_str("heartbeat_timeout_ms = 2500").unwrap();
        assert_eq!(cfg.heartbeat_timeout_ms, 2500);
        assert_eq!(cfg.handshake_attempts, 5);
    }

    #[test]
    fn sanitized_clamps() {
        let cfg = EngineConfig {
            handshake_attempts: 0,
            heartbeat_interval_ms: 0,
            receive_poll_ms: 0,
            frame_queue_depth: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.handshake_attempts, 1);
        assert_eq!(cfg.heartbeat_interval_ms, 1);
        assert_eq!(cfg.receive_poll_ms, 1);
        assert_eq!(cfg.frame_queue_depth, 1);
    }
}
