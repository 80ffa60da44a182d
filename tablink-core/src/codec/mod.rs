//! Packet codec for every TabLink datagram.
//!
//! All layouts are fixed and little-endian. There is no envelope: the
//! datagram length and leading byte are the only type information.
//!
//! | Direction     | Message           | Size      | Leading byte |
//! |---------------|-------------------|-----------|--------------|
//! | client → host | DeviceInfoRequest | 13        | `0xFF`       |
//! | client → host | StylusSample      | 17        | action/flags |
//! | host → client | DeviceInfoAck     | 1         | `0xFE`       |
//! | both          | HeartbeatPing     | 1         | `0xFD`       |
//! | both          | HeartbeatPong     | 1         | `0xFC`       |
//! | host → client | FrameMessage      | 24 + n    | width LSB    |
//!
//! Frame datagrams carry no tag, so classification on the client goes by
//! length first: anything at least [`FrameMessage::HEADER_SIZE`] bytes is
//! a frame, anything shorter is a tagged control message.

pub mod control;
pub mod frame;
pub mod stylus;

use bytes::Bytes;

pub use control::{
    ControlMessage, DeviceDescriptor, TAG_DEVICE_INFO_ACK, TAG_DEVICE_INFO_REQUEST,
    TAG_HEARTBEAT_PING, TAG_HEARTBEAT_PONG,
};
pub use frame::FrameMessage;
pub use stylus::{SampleFlags, StylusAction, StylusSample, decompose_tilt};

use crate::error::MalformedPacket;

// ── ClientPacket ─────────────────────────────────────────────────

/// A datagram received by the client engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    Control(ControlMessage),
    Frame(FrameMessage),
}

impl ClientPacket {
    /// Classify and decode a datagram received from the host.
    ///
    /// A DeviceInfoAck may carry trailing bytes (some hosts echo the
    /// device descriptor); they are ignored.
    pub fn decode(datagram: &Bytes) -> Result<Self, MalformedPacket> {
        let Some(&tag) = datagram.first() else {
            return Err(MalformedPacket::Truncated {
                kind: "datagram",
                expected: 1,
                actual: 0,
            });
        };

        if datagram.len() >= FrameMessage::HEADER_SIZE {
            return FrameMessage::decode(datagram).map(Self::Frame);
        }

        match ControlMessage::from_tag(tag)? {
            ControlMessage::DeviceInfoAck => Ok(Self::Control(ControlMessage::DeviceInfoAck)),
            msg if datagram.len() == 1 => Ok(Self::Control(msg)),
            _ => Err(MalformedPacket::InvalidField {
                field: "control message length",
                value: datagram.len() as i64,
            }),
        }
    }
}

// ── HostPacket ───────────────────────────────────────────────────

/// A datagram received by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostPacket {
    DeviceInfoRequest(DeviceDescriptor),
    Sample(StylusSample),
    Control(ControlMessage),
}

impl HostPacket {
    /// Classify and decode a datagram received from the client.
    pub fn decode(datagram: &[u8]) -> Result<Self, MalformedPacket> {
        let Some(&tag) = datagram.first() else {
            return Err(MalformedPacket::Truncated {
                kind: "datagram",
                expected: 1,
                actual: 0,
            });
        };

        match (tag, datagram.len()) {
            (TAG_DEVICE_INFO_REQUEST, _) => {
                DeviceDescriptor::decode_request(datagram).map(Self::DeviceInfoRequest)
            }
            (_, StylusSample::SIZE) => StylusSample::decode(datagram).map(Self::Sample),
            (_, 1) => ControlMessage::from_tag(tag).map(Self::Control),
            (_, len) if len < StylusSample::SIZE => Err(MalformedPacket::Truncated {
                kind: "stylus sample",
                expected: StylusSample::SIZE,
                actual: len,
            }),
            _ => Err(MalformedPacket::UnknownTag(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_control_messages() {
        for msg in [
            ControlMessage::DeviceInfoAck,
            ControlMessage::HeartbeatPing,
            ControlMessage::HeartbeatPong,
        ] {
            let buf = Bytes::copy_from_slice(&msg.encode());
            assert_eq!(ClientPacket::decode(&buf), Ok(ClientPacket::Control(msg)));
        }
    }

    #[test]
    fn ack_with_echoed_descriptor() {
        let mut buf = DeviceDescriptor::default().encode_request().to_vec();
        buf[0] = TAG_DEVICE_INFO_ACK;
        assert_eq!(
            ClientPacket::decode(&Bytes::from(buf)),
            Ok(ClientPacket::Control(ControlMessage::DeviceInfoAck))
        );
    }

    #[test]
    fn client_frame() {
        let msg = FrameMessage {
            width: 2,
            height: 2,
            frame_rate: 60,
            timestamp: 5,
            payload: Bytes::from_static(b"zstd"),
        };
        let buf = Bytes::from(msg.encode());
        assert_eq!(ClientPacket::decode(&buf), Ok(ClientPacket::Frame(msg)));
    }

    #[test]
    fn short_zeroed_datagrams_are_rejected_not_panicking() {
        for len in [20, 23] {
            let buf = Bytes::from(vec![0u8; len]);
            assert!(ClientPacket::decode(&buf).is_err(), "len {len}");
        }
        // Exactly one header with an empty payload is a (degenerate) frame.
        let header = Bytes::from(vec![0u8; FrameMessage::HEADER_SIZE]);
        assert!(matches!(
            ClientPacket::decode(&header),
            Ok(ClientPacket::Frame(FrameMessage { width: 0, .. }))
        ));
    }

    #[test]
    fn client_malformed() {
        assert!(matches!(
            ClientPacket::decode(&Bytes::new()),
            Err(MalformedPacket::Truncated { actual: 0, .. })
        ));
        assert_eq!(
            ClientPacket::decode(&Bytes::from_static(&[0x01])),
            Err(MalformedPacket::UnknownTag(0x01))
        );
        // A pong is a single byte; anything else with that tag is garbage.
        assert!(ClientPacket::decode(&Bytes::from_static(&[0xFC, 0, 0])).is_err());
        // The request is outbound only; a client never accepts one.
        let req = Bytes::copy_from_slice(&DeviceDescriptor::default().encode_request());
        assert_eq!(
            ClientPacket::decode(&req),
            Err(MalformedPacket::UnknownTag(0xFF))
        );
    }

    #[test]
    fn host_classification() {
        let desc = DeviceDescriptor::new(800, 600, 90.0);
        assert_eq!(
            HostPacket::decode(&desc.encode_request()),
            Ok(HostPacket::DeviceInfoRequest(desc))
        );

        let sample = StylusSample::new(StylusAction::Move, 10.0, 20.0, 0.3);
        assert_eq!(
            HostPacket::decode(&sample.encode()),
            Ok(HostPacket::Sample(sample))
        );

        assert_eq!(
            HostPacket::decode(&[TAG_HEARTBEAT_PING]),
            Ok(HostPacket::Control(ControlMessage::HeartbeatPing))
        );
    }

    #[test]
    fn host_malformed() {
        assert!(HostPacket::decode(&[]).is_err());
        // Truncated request.
        assert!(matches!(
            HostPacket::decode(&[0xFF, 1, 2]),
            Err(MalformedPacket::Truncated { expected: 13, .. })
        ));
        // Truncated sample.
        let sample = StylusSample::new(StylusAction::Down, 1.0, 1.0, 1.0).encode();
        assert!(matches!(
            HostPacket::decode(&sample[..9]),
            Err(MalformedPacket::Truncated { expected: 17, .. })
        ));
        // Oversized garbage.
        assert_eq!(
            HostPacket::decode(&[0x05; 40]),
            Err(MalformedPacket::UnknownTag(0x05))
        );
    }
}
