//! Domain-specific error types for the TabLink engine.
//!
//! All fallible operations return `Result<T, TabLinkError>`.
//! Decode failures have their own [`MalformedPacket`] type so the
//! receive loop can drop them without ever surfacing them to the caller.

use std::time::Duration;

use thiserror::Error;

/// The canonical error type for the TabLink engine.
#[derive(Debug, Error)]
pub enum TabLinkError {
    // ── Session Errors ───────────────────────────────────────────
    /// No DeviceInfoAck arrived within the handshake retry budget.
    #[error("handshake timed out after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },

    /// An established session died (heartbeat timeout or socket failure).
    #[error("connection lost: {0}")]
    ConnectionLost(LossReason),

    /// The operation needs a Connected session.
    #[error("not connected")]
    NotConnected,

    /// The operation was cancelled by `disconnect()` or a newer `connect()`.
    #[error("operation cancelled")]
    Cancelled,

    // ── Packet Errors ────────────────────────────────────────────
    /// A datagram could not be decoded.
    #[error("malformed packet: {0}")]
    MalformedPacket(#[from] MalformedPacket),

    /// A frame payload decoded but could not be reconstructed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    // ── Transport Errors ─────────────────────────────────────────
    /// The UDP socket reported an error.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The user-supplied host address could not be parsed or resolved.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

// ── MalformedPacket ──────────────────────────────────────────────

/// Why a datagram was rejected by the packet codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPacket {
    /// The buffer is shorter than the layout its tag implies.
    #[error("{kind} needs {expected} bytes, got {actual}")]
    Truncated {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The leading byte is not a known message tag.
    #[error("unknown tag {0:#04x}")]
    UnknownTag(u8),

    /// The stylus action nibble is outside 0..=3.
    #[error("unknown stylus action code {0}")]
    UnknownAction(u8),

    /// A header field holds a value that cannot describe a real message.
    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: i64 },
}

// ── FrameError ───────────────────────────────────────────────────

/// Failures of the frame encode / reconstruct pipeline.
#[derive(Debug, Error)]
pub enum FrameError {
    /// zstd could not compress or decompress the payload.
    #[error("zstd: {0}")]
    Compression(std::io::Error),

    /// Decompressed bytes do not cover `width * height` pixels.
    #[error("decompressed {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Dimensions do not fit the wire format's `i32` fields, or exceed
    /// the receiver's frame size limit.
    #[error("unsupported frame dimensions {width}x{height}")]
    Dimensions { width: u32, height: u32 },

    /// Pixel buffer handed to the encoder has the wrong length.
    #[error("pixel buffer is {actual} bytes, expected {expected}")]
    InvalidPixels { expected: usize, actual: usize },
}

// ── Reasons surfaced through events ──────────────────────────────

/// Why an established session was torn down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LossReason {
    /// No HeartbeatPong within the configured timeout.
    #[error("no heartbeat reply for {0:?}")]
    HeartbeatTimeout(Duration),

    /// The socket failed while the session was Connected.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Why a `connect()` attempt did not reach Connected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// Handshake retries exhausted.
    #[error("server not responding after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },

    /// Address parsing / resolution failed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Socket bind or send failed during the handshake.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl TabLinkError {
    /// Translate a connect-time error into the reason carried by
    /// `SessionEvent::ConnectionFailed`.
    ///
    /// Returns `None` for cancellations, which are not failures.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::HandshakeTimeout { attempts } => Some(FailureReason::HandshakeTimeout {
                attempts: *attempts,
            }),
            Self::InvalidAddress(addr) => Some(FailureReason::InvalidAddress(addr.clone())),
            Self::Cancelled => None,
            other => Some(FailureReason::Transport(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = TabLinkError::HandshakeTimeout { attempts: 5 };
        assert!(e.to_string().contains("5 attempts"));

        let e = MalformedPacket::Truncated {
            kind: "stylus sample",
            expected: 17,
            actual: 3,
        };
        assert!(e.to_string().contains("17"));
        assert!(e.to_string().contains("3"));

        let e = MalformedPacket::UnknownTag(0x42);
        assert_eq!(e.to_string(), "unknown tag 0x42");
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e: TabLinkError = io_err.into();
        assert!(matches!(e, TabLinkError::Transport(_)));
    }

    #[test]
    fn failure_reason_mapping() {
        let e = TabLinkError::HandshakeTimeout { attempts: 5 };
        assert_eq!(
            e.failure_reason(),
            Some(FailureReason::HandshakeTimeout { attempts: 5 })
        );
        assert_eq!(TabLinkError::Cancelled.failure_reason(), None);

        let e = TabLinkError::InvalidAddress("nope".into());
        assert!(matches!(
            e.failure_reason(),
            Some(FailureReason::InvalidAddress(_))
        ));
    }
}
