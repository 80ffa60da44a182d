//! Client-side frame reconstruction.
//!
//! Takes [`FrameMessage`]s received from the host, decompresses them and
//! folds them into a persistent frame buffer. A payload is either a full
//! frame (first frame, or after a resolution change) or the XOR of the
//! new frame with the previous one.
//!
//! Frame dimensions come straight off the wire, so nothing is sized from
//! them until they pass the configured limit, and decompression reads at
//! most one byte past the expected length.

use std::io::Read;

use bytes::Bytes;

use crate::codec::FrameMessage;
use crate::error::FrameError;
use crate::frame::{BYTES_PER_PIXEL, ReconstructedFrame, raw_frame_len, xor_into};

// ── FrameReconstructor ───────────────────────────────────────────

/// Largest frame accepted by default: 7680x4320 RGBA.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 7680 * 4320 * BYTES_PER_PIXEL;

/// Owns the previous-frame buffer and applies each incoming payload.
pub struct FrameReconstructor {
    /// Absolute pixels of the last reconstructed frame (RGBA8888).
    frame_buffer: Vec<u8>,
    max_frame_bytes: usize,
    buf_width: u32,
    buf_height: u32,
    frames: u64,
    full_frames: u64,
}

impl FrameReconstructor {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_FRAME_BYTES)
    }

    /// Reconstructor that rejects frames larger than `max_frame_bytes`
    /// once decompressed.
    pub fn with_limit(max_frame_bytes: usize) -> Self {
        Self {
            frame_buffer: Vec::new(),
            max_frame_bytes,
            buf_width: 0,
            buf_height: 0,
            frames: 0,
            full_frames: 0,
        }
    }

    /// Decompress `msg`, update the frame buffer and return a snapshot.
    ///
    /// If the message's resolution differs from the buffer's, the buffer
    /// is reallocated and the payload taken as a full frame; a delta
    /// against a differently sized frame has no meaning.
    pub fn on_frame_message(&mut self, msg: &FrameMessage) -> Result<ReconstructedFrame, FrameError> {
        let width = msg.width as u32;
        let height = msg.height as u32;
        let expected = raw_frame_len(width, height)?;
        if expected > self.max_frame_bytes {
            return Err(FrameError::Dimensions { width, height });
        }

        let raw = decompress_capped(&msg.payload, expected)?;
        if raw.len() != expected {
            return Err(FrameError::SizeMismatch {
                expected,
                actual: raw.len(),
            });
        }

        if self.frame_buffer.len() != expected
            || width != self.buf_width
            || height != self.buf_height
        {
            self.frame_buffer = raw;
            self.buf_width = width;
            self.buf_height = height;
            self.full_frames += 1;
        } else {
            xor_into(&mut self.frame_buffer, &raw);
        }
        self.frames += 1;

        Ok(ReconstructedFrame {
            width,
            height,
            frame_rate: msg.frame_rate,
            timestamp: msg.timestamp,
            pixels: Bytes::copy_from_slice(&self.frame_buffer),
        })
    }

    /// Current frame buffer contents (empty before the first frame).
    pub fn frame_buffer(&self) -> &[u8] {
        &self.frame_buffer
    }

    /// Dimensions of the current frame buffer.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.buf_width, self.buf_height)
    }

    /// Frames reconstructed so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Frames that replaced the buffer instead of patching it.
    pub fn full_frame_count(&self) -> u64 {
        self.full_frames
    }

    /// Drop the frame buffer so the next frame is taken as full.
    pub fn reset(&mut self) {
        self.frame_buffer = Vec::new();
        self.buf_width = 0;
        self.buf_height = 0;
    }

    /// Largest decompressed frame this reconstructor accepts.
    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    /// Bytes per pixel of the reconstructed buffer.
    pub const fn bytes_per_pixel(&self) -> usize {
        BYTES_PER_PIXEL
    }
}

impl Default for FrameReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream-decompress `payload`, stopping one byte past `expected` so an
/// oversized payload shows up as a size mismatch without inflating fully.
fn decompress_capped(payload: &[u8], expected: usize) -> Result<Vec<u8>, FrameError> {
    let decoder = zstd::stream::read::Decoder::new(payload).map_err(FrameError::Compression)?;
    let mut raw = Vec::new();
    decoder
        .take(expected as u64 + 1)
        .read_to_end(&mut raw)
        .map_err(FrameError::Compression)?;
    Ok(raw)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn message(width: i32, height: i32, raw: &[u8]) -> FrameMessage {
        FrameMessage {
            width,
            height,
            frame_rate: 30,
            timestamp: 42,
            payload: Bytes::from(zstd::encode_all(raw, 1).unwrap()),
        }
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    #[test]
    fn first_frame_is_full_replacement() {
        let target = pattern(8 * 4 * 4, 7);
        let mut rec = FrameReconstructor::new();

        let frame = rec.on_frame_message(&message(8, 4, &target)).unwrap();

        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 4);
        assert_eq!(frame.timestamp, 42);
        assert_eq!(frame.pixels.as_ref(), target.as_slice());
        assert_eq!(rec.full_frame_count(), 1);
    }

    #[test]
    fn delta_reconstructs_target() {
        let previous = pattern(16 * 16 * 4, 1);
        let mut target = previous.clone();
        for px in target.iter_mut().skip(100).take(300) {
            *px = px.wrapping_add(0x55);
        }
        let delta: Vec<u8> = previous.iter().zip(&target).map(|(a, b)| a ^ b).collect();

        let mut rec = FrameReconstructor::new();
        rec.on_frame_message(&message(16, 16, &previous)).unwrap();
        let frame = rec.on_frame_message(&message(16, 16, &delta)).unwrap();

        assert_eq!(frame.pixels.as_ref(), target.as_slice());
        assert_eq!(rec.frame_buffer(), target.as_slice());
        assert_eq!(rec.frame_count(), 2);
        assert_eq!(rec.full_frame_count(), 1);
    }

    #[test]
    fn resolution_change_reallocates() {
        let mut rec = FrameReconstructor::new();
        rec.on_frame_message(&message(4, 4, &pattern(64, 0))).unwrap();

        let bigger = pattern(8 * 8 * 4, 9);
        let frame = rec.on_frame_message(&message(8, 8, &bigger)).unwrap();

        assert_eq!(frame.pixels.as_ref(), bigger.as_slice());
        assert_eq!(rec.dimensions(), (8, 8));
        assert_eq!(rec.full_frame_count(), 2);
    }

    #[test]
    fn transposed_resolution_is_full_frame() {
        // Same byte count, different shape.
        let mut rec = FrameReconstructor::new();
        rec.on_frame_message(&message(2, 8, &pattern(64, 3))).unwrap();

        let replacement = pattern(64, 200);
        let frame = rec.on_frame_message(&message(8, 2, &replacement)).unwrap();
        assert_eq!(frame.pixels.as_ref(), replacement.as_slice());
    }

    #[test]
    fn size_mismatch_keeps_buffer() {
        let mut rec = FrameReconstructor::new();
        let first = pattern(64, 5);
        rec.on_frame_message(&message(4, 4, &first)).unwrap();

        let err = rec.on_frame_message(&message(4, 4, &pattern(60, 5))).unwrap_err();
        assert!(matches!(
            err,
            FrameError::SizeMismatch {
                expected: 64,
                actual: 60
            }
        ));
        assert_eq!(rec.frame_buffer(), first.as_slice());
    }

    #[test]
    fn huge_declared_dimensions_rejected_before_allocating() {
        let mut rec = FrameReconstructor::new();
        let msg = message(1 << 30, 1 << 30, &pattern(16, 0));
        assert!(matches!(
            rec.on_frame_message(&msg),
            Err(FrameError::Dimensions {
                width: 0x4000_0000,
                height: 0x4000_0000
            })
        ));
        assert!(rec.frame_buffer().is_empty());
    }

    #[test]
    fn custom_limit_applies() {
        let mut rec = FrameReconstructor::with_limit(8 * 8 * 4);
        assert!(rec.on_frame_message(&message(8, 8, &pattern(256, 2))).is_ok());
        assert!(matches!(
            rec.on_frame_message(&message(9, 8, &pattern(288, 2))),
            Err(FrameError::Dimensions { width: 9, height: 8 })
        ));
        assert_eq!(rec.dimensions(), (8, 8));
    }

    #[test]
    fn oversized_payload_reports_mismatch() {
        let mut rec = FrameReconstructor::new();
        // Decompresses to more than 4x4 pixels.
        let err = rec.on_frame_message(&message(4, 4, &pattern(1024, 0))).unwrap_err();
        assert!(matches!(
            err,
            FrameError::SizeMismatch {
                expected: 64,
                actual: 65
            }
        ));
        assert!(rec.frame_buffer().is_empty());
    }

    #[test]
    fn garbage_payload_rejected() {
        let mut rec = FrameReconstructor::new();
        let msg = FrameMessage {
            width: 4,
            height: 4,
            frame_rate: 30,
            timestamp: 0,
            payload: Bytes::from_static(b"not a zstd stream"),
        };
        assert!(matches!(
            rec.on_frame_message(&msg),
            Err(FrameError::Compression(_))
        ));
    }

    #[test]
    fn reset_forces_full_frame() {
        let mut rec = FrameReconstructor::new();
        rec.on_frame_message(&message(4, 4, &pattern(64, 1))).unwrap();
        rec.reset();

        let fresh = pattern(64, 77);
        let frame = rec.on_frame_message(&message(4, 4, &fresh)).unwrap();
        assert_eq!(frame.pixels.as_ref(), fresh.as_slice());
    }
}
