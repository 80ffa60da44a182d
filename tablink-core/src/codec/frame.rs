//! Screen-frame datagrams (host → client).
//!
//! ```text
//! FrameMessage (24 byte header + payload, little-endian)
//!   width:           i32
//!   height:          i32
//!   frame_rate:      i32
//!   compressed_size: i32
//!   timestamp:       i64
//!   payload:         [u8; compressed_size]
//! ```
//!
//! The payload is a zstd stream of the frame XOR-ed with the previous
//! frame (or the raw frame after a resolution change), see
//! [`crate::frame`].

use bytes::{Buf, Bytes};

use crate::error::MalformedPacket;

/// One compressed screen frame as carried in a single datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMessage {
    pub width: i32,
    pub height: i32,
    pub frame_rate: i32,
    /// Sender timestamp in milliseconds.
    pub timestamp: i64,
    /// Compressed frame bytes.
    pub payload: Bytes,
}

impl FrameMessage {
    /// Encoded header size on the wire.
    pub const HEADER_SIZE: usize = 24;

    /// Size of the full datagram.
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }

    /// Serialize header and payload into one datagram.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.frame_rate.to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as i32).to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Deserialize from a datagram without copying the payload.
    ///
    /// Bytes beyond `compressed_size` are ignored.
    pub fn decode(datagram: &Bytes) -> Result<Self, MalformedPacket> {
        if datagram.len() < Self::HEADER_SIZE {
            return Err(MalformedPacket::Truncated {
                kind: "frame header",
                expected: Self::HEADER_SIZE,
                actual: datagram.len(),
            });
        }

        let mut header = &datagram[..Self::HEADER_SIZE];
        let width = header.get_i32_le();
        let height = header.get_i32_le();
        let frame_rate = header.get_i32_le();
        let compressed_size = header.get_i32_le();
        let timestamp = header.get_i64_le();

        for (field, value) in [
            ("width", width),
            ("height", height),
            ("compressed size", compressed_size),
        ] {
            if value < 0 {
                return Err(MalformedPacket::InvalidField {
                    field,
                    value: value as i64,
                });
            }
        }

        let end = Self::HEADER_SIZE + compressed_size as usize;
        if datagram.len() < end {
            return Err(MalformedPacket::Truncated {
                kind: "frame payload",
                expected: end,
                actual: datagram.len(),
            });
        }

        Ok(Self {
            width,
            height,
            frame_rate,
            timestamp,
            payload: datagram.slice(Self::HEADER_SIZE..end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrameMessage {
        FrameMessage {
            width: 640,
            height: 480,
            frame_rate: 30,
            timestamp: 1_700_000_000_123,
            payload: Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7]),
        }
    }

    #[test]
    fn header_layout() {
        let buf = sample().encode();
        assert_eq!(buf.len(), 31);
        assert_eq!(&buf[0..4], &640i32.to_le_bytes());
        assert_eq!(&buf[4..8], &480i32.to_le_bytes());
        assert_eq!(&buf[8..12], &30i32.to_le_bytes());
        assert_eq!(&buf[12..16], &7i32.to_le_bytes());
        assert_eq!(&buf[16..24], &1_700_000_000_123i64.to_le_bytes());
        assert_eq!(&buf[24..], &[1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn decode_encoded() {
        let msg = sample();
        let decoded = FrameMessage::decode(&Bytes::from(msg.encode())).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut buf = sample().encode();
        buf.extend_from_slice(&[0xEE; 5]);
        let decoded = FrameMessage::decode(&Bytes::from(buf)).unwrap();
        assert_eq!(decoded.payload.as_ref(), &[1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn header_too_short() {
        let buf = Bytes::from(vec![0u8; 23]);
        assert_eq!(
            FrameMessage::decode(&buf),
            Err(MalformedPacket::Truncated {
                kind: "frame header",
                expected: 24,
                actual: 23,
            })
        );
    }

    #[test]
    fn encoded_len_matches_encode() {
        let msg = FrameMessage {
            payload: Bytes::from_static(&[9; 4]),
            ..sample()
        };
        assert_eq!(msg.encode().len(), 28);
        assert_eq!(msg.encoded_len(), 28);
    }

    #[test]
    fn payload_shorter_than_declared() {
        let buf = sample().encode();
        let cut = Bytes::from(buf[..buf.len() - 2].to_vec());
        assert_eq!(
            FrameMessage::decode(&cut),
            Err(MalformedPacket::Truncated {
                kind: "frame payload",
                expected: 31,
                actual: 29,
            })
        );
    }

    #[test]
    fn negative_fields_rejected() {
        let mut buf = sample().encode();
        buf[12..16].copy_from_slice(&(-1i32).to_le_bytes());
        assert_eq!(
            FrameMessage::decode(&Bytes::from(buf)),
            Err(MalformedPacket::InvalidField {
                field: "compressed size",
                value: -1,
            })
        );
    }
}
