//! Host-side frame encoder.
//!
//! Produces the [`FrameMessage`]s the client's
//! [`FrameReconstructor`](super::FrameReconstructor) consumes: the first
//! frame (or the first after a resolution change) is sent raw, every
//! later frame as `previous XOR current`. Unchanged regions become runs
//! of zero bytes, which zstd compresses to almost nothing.

use bytes::Bytes;

use crate::codec::FrameMessage;
use crate::error::FrameError;
use crate::frame::{raw_frame_len, xor_into};

// ── EncodedFrame ─────────────────────────────────────────────────

/// A compressed frame ready for transmission.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub message: FrameMessage,
    /// Whether the payload is a full frame rather than a delta.
    pub is_full_frame: bool,
    /// Uncompressed size of the payload.
    pub raw_len: usize,
}

// ── FrameEncoder ─────────────────────────────────────────────────

/// Stateful XOR-delta + zstd encoder.
pub struct FrameEncoder {
    previous: Vec<u8>,
    width: u32,
    height: u32,
    /// zstd compression level (1 = fastest).
    compression_level: i32,
    frame_count: u64,
}

impl FrameEncoder {
    /// Create an encoder with the given zstd level.
    pub fn new(compression_level: i32) -> Self {
        Self {
            previous: Vec::new(),
            width: 0,
            height: 0,
            compression_level,
            frame_count: 0,
        }
    }

    /// Encode one absolute RGBA8888 frame.
    pub fn encode(
        &mut self,
        width: u32,
        height: u32,
        frame_rate: i32,
        pixels: &[u8],
        timestamp: i64,
    ) -> Result<EncodedFrame, FrameError> {
        let expected = raw_frame_len(width, height)?;
        if pixels.len() != expected {
            return Err(FrameError::InvalidPixels {
                expected,
                actual: pixels.len(),
            });
        }
        let (Ok(wire_width), Ok(wire_height)) = (i32::try_from(width), i32::try_from(height))
        else {
            return Err(FrameError::Dimensions { width, height });
        };

        let is_full_frame = width != self.width || height != self.height || self.previous.is_empty();
        let raw = if is_full_frame {
            pixels.to_vec()
        } else {
            let mut delta = self.previous.clone();
            xor_into(&mut delta, pixels);
            delta
        };

        let compressed =
            zstd::encode_all(raw.as_slice(), self.compression_level).map_err(FrameError::Compression)?;

        self.previous.clear();
        self.previous.extend_from_slice(pixels);
        self.width = width;
        self.height = height;
        self.frame_count += 1;

        Ok(EncodedFrame {
            message: FrameMessage {
                width: wire_width,
                height: wire_height,
                frame_rate,
                timestamp,
                payload: Bytes::from(compressed),
            },
            is_full_frame,
            raw_len: raw.len(),
        })
    }

    /// Forget the previous frame, forcing the next one to be full.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.width = 0;
        self.height = 0;
    }

    /// Number of frames encoded so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(1)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameReconstructor;

    fn gradient(w: u32, h: u32, shift: u8) -> Vec<u8> {
        (0..w * h * 4).map(|i| ((i / 4) as u8).wrapping_add(shift)).collect()
    }

    #[test]
    fn first_frame_is_full() {
        let mut enc = FrameEncoder::default();
        let frame = gradient(32, 32, 0);
        let encoded = enc.encode(32, 32, 60, &frame, 1).unwrap();

        assert!(encoded.is_full_frame);
        assert_eq!(encoded.raw_len, frame.len());
        assert_eq!(encoded.message.width, 32);
        assert_eq!(enc.frame_count(), 1);
    }

    #[test]
    fn identical_frame_compresses_to_almost_nothing() {
        let mut enc = FrameEncoder::default();
        let frame = gradient(64, 64, 3);
        let full = enc.encode(64, 64, 60, &frame, 1).unwrap();
        let delta = enc.encode(64, 64, 60, &frame, 2).unwrap();

        assert!(!delta.is_full_frame);
        assert!(delta.message.payload.len() < full.message.payload.len());
        assert!(delta.message.payload.len() < 64);
    }

    #[test]
    fn resize_sends_full_frame() {
        let mut enc = FrameEncoder::default();
        enc.encode(8, 8, 30, &gradient(8, 8, 0), 1).unwrap();
        let resized = enc.encode(16, 8, 30, &gradient(16, 8, 0), 2).unwrap();
        assert!(resized.is_full_frame);
    }

    #[test]
    fn wrong_pixel_length_rejected() {
        let mut enc = FrameEncoder::default();
        let err = enc.encode(8, 8, 30, &[0u8; 10], 1).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidPixels {
                expected: 256,
                actual: 10
            }
        ));
    }

    #[test]
    fn encoder_feeds_reconstructor() {
        let mut enc = FrameEncoder::default();
        let mut rec = FrameReconstructor::new();

        for shift in [0u8, 0, 9, 9, 200] {
            let frame = gradient(24, 12, shift);
            let encoded = enc.encode(24, 12, 30, &frame, shift as i64).unwrap();
            let decoded = rec.on_frame_message(&encoded.message).unwrap();
            assert_eq!(decoded.pixels.as_ref(), frame.as_slice());
        }
        assert_eq!(rec.full_frame_count(), 1);
    }

    #[test]
    fn reset_forces_full() {
        let mut enc = FrameEncoder::default();
        let frame = gradient(4, 4, 0);
        enc.encode(4, 4, 30, &frame, 1).unwrap();
        enc.reset();
        assert!(enc.encode(4, 4, 30, &frame, 2).unwrap().is_full_frame);
    }
}
