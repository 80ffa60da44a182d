//! Handshake and heartbeat control messages.
//!
//! ```text
//! DeviceInfoRequest (13 bytes)   DeviceInfoAck (1 byte)
//!   tag:          u8  = 0xFF       tag: u8 = 0xFE
//!   width:        i32
//!   height:       i32            HeartbeatPing (1 byte)
//!   refresh_rate: f32              tag: u8 = 0xFD
//!
//!                                HeartbeatPong (1 byte)
//!                                  tag: u8 = 0xFC
//! ```

use bytes::Buf;
use serde::{Deserialize, Serialize};

use crate::error::MalformedPacket;

/// Client → host: device capabilities, starts a session.
pub const TAG_DEVICE_INFO_REQUEST: u8 = 0xFF;
/// Host → client: handshake accepted.
pub const TAG_DEVICE_INFO_ACK: u8 = 0xFE;
/// Liveness probe.
pub const TAG_HEARTBEAT_PING: u8 = 0xFD;
/// Liveness reply.
pub const TAG_HEARTBEAT_PONG: u8 = 0xFC;

// ── DeviceDescriptor ─────────────────────────────────────────────

/// Display geometry of the client device, sent verbatim in the
/// handshake request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDescriptor {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Display refresh rate in Hz.
    pub refresh_rate: f32,
}

impl DeviceDescriptor {
    /// Encoded size of a DeviceInfoRequest on the wire.
    pub const REQUEST_SIZE: usize = 13;

    pub fn new(width: i32, height: i32, refresh_rate: f32) -> Self {
        Self {
            width,
            height,
            refresh_rate,
        }
    }

    /// Serialize as a DeviceInfoRequest datagram.
    pub fn encode_request(&self) -> [u8; Self::REQUEST_SIZE] {
        let mut buf = [0u8; Self::REQUEST_SIZE];
        buf[0] = TAG_DEVICE_INFO_REQUEST;
        buf[1..5].copy_from_slice(&self.width.to_le_bytes());
        buf[5..9].copy_from_slice(&self.height.to_le_bytes());
        buf[9..13].copy_from_slice(&self.refresh_rate.to_le_bytes());
        buf
    }

    /// Parse a DeviceInfoRequest datagram (tag included).
    pub fn decode_request(data: &[u8]) -> Result<Self, MalformedPacket> {
        match data.first() {
            None => {
                return Err(MalformedPacket::Truncated {
                    kind: "device info request",
                    expected: Self::REQUEST_SIZE,
                    actual: 0,
                });
            }
            Some(&TAG_DEVICE_INFO_REQUEST) => {}
            Some(&other) => return Err(MalformedPacket::UnknownTag(other)),
        }
        if data.len() < Self::REQUEST_SIZE {
            return Err(MalformedPacket::Truncated {
                kind: "device info request",
                expected: Self::REQUEST_SIZE,
                actual: data.len(),
            });
        }

        let mut body = &data[1..Self::REQUEST_SIZE];
        Ok(Self {
            width: body.get_i32_le(),
            height: body.get_i32_le(),
            refresh_rate: body.get_f32_le(),
        })
    }
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        Self {
            width: 2560,
            height: 1600,
            refresh_rate: 60.0,
        }
    }
}

// ── ControlMessage ───────────────────────────────────────────────

/// Single-tag control messages (everything except the request, which
/// carries a body).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMessage {
    DeviceInfoAck,
    HeartbeatPing,
    HeartbeatPong,
}

impl ControlMessage {
    /// Wire tag for this message.
    pub const fn tag(self) -> u8 {
        match self {
            Self::DeviceInfoAck => TAG_DEVICE_INFO_ACK,
            Self::HeartbeatPing => TAG_HEARTBEAT_PING,
            Self::HeartbeatPong => TAG_HEARTBEAT_PONG,
        }
    }

    /// Serialize to a one-byte datagram.
    pub const fn encode(self) -> [u8; 1] {
        [self.tag()]
    }

    /// Map a leading tag byte back to a control message.
    pub fn from_tag(tag: u8) -> Result<Self, MalformedPacket> {
        match tag {
            TAG_DEVICE_INFO_ACK => Ok(Self::DeviceInfoAck),
            TAG_HEARTBEAT_PING => Ok(Self::HeartbeatPing),
            TAG_HEARTBEAT_PONG => Ok(Self::HeartbeatPong),
            other => Err(MalformedPacket::UnknownTag(other)),
        }
    }
}
