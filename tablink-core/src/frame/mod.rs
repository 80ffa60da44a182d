//! # Screen mirroring frames
//!
//! The host streams its screen as one datagram per frame:
//!
//! ```text
//! HOST                                   CLIENT
//! ┌──────────────────────┐               ┌───────────────────────────┐
//! │ absolute RGBA frame  │               │ Inbound Dispatcher        │
//! │   ↓ XOR previous     │   UDP         │   ↓ (frame pipeline task) │
//! │   ↓ zstd compress    │ ──────────►   │ FrameReconstructor        │
//! │ FrameMessage         │               │   ↓ zstd, XOR into buffer │
//! └──────────────────────┘               │ ReconstructedFrame        │
//!                                        └───────────────────────────┘
//! ```
//!
//! | Module          | Purpose                                      |
//! |-----------------|----------------------------------------------|
//! | `encoder`       | XOR-delta + zstd encoder (host side)         |
//! | `reconstructor` | Decompress + XOR into frame buffer (client)  |

pub mod encoder;
pub mod reconstructor;

use bytes::Bytes;

pub use encoder::{EncodedFrame, FrameEncoder};
pub use reconstructor::{DEFAULT_MAX_FRAME_BYTES, FrameReconstructor};

use crate::error::FrameError;

/// Pixel layout of every frame: RGBA8888.
pub const BYTES_PER_PIXEL: usize = 4;

// ── ReconstructedFrame ───────────────────────────────────────────

/// An absolute frame ready for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructedFrame {
    pub width: u32,
    pub height: u32,
    pub frame_rate: i32,
    /// Sender timestamp in milliseconds.
    pub timestamp: i64,
    /// Tightly packed RGBA8888 rows.
    pub pixels: Bytes,
}

/// Byte length of a `width × height` RGBA frame.
pub(crate) fn raw_frame_len(width: u32, height: u32) -> Result<usize, FrameError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(BYTES_PER_PIXEL))
        .ok_or(FrameError::Dimensions { width, height })
}

/// `dst[i] ^= delta[i]` over the common length.
pub fn xor_into(dst: &mut [u8], delta: &[u8]) {
    for (d, x) in dst.iter_mut().zip(delta) {
        *d ^= *x;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_is_an_involution() {
        let previous: Vec<u8> = (0..=255).collect();
        let target: Vec<u8> = (0..=255).rev().collect();
        let delta: Vec<u8> = previous.iter().zip(&target).map(|(a, b)| a ^ b).collect();

        let mut buf = previous.clone();
        xor_into(&mut buf, &delta);
        assert_eq!(buf, target);
        xor_into(&mut buf, &delta);
        assert_eq!(buf, previous);
    }

    #[test]
    fn frame_len() {
        assert_eq!(raw_frame_len(1920, 1080).unwrap(), 1920 * 1080 * 4);
        assert_eq!(raw_frame_len(0, 10).unwrap(), 0);
    }
}
