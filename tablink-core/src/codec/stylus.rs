//! Stylus sample encoding and tilt decomposition.
//!
//! ```text
//! StylusSample (17 bytes, little-endian)
//!   action_flags: u8   low nibble = action, bit 4 = barrel button
//!   x:            f32
//!   y:            f32
//!   pressure:     f32
//!   tilt_x:       i16
//!   tilt_y:       i16
//! ```

use bitflags::bitflags;
use bytes::Buf;

use crate::error::MalformedPacket;

bitflags! {
    /// Flag bits packed above the action nibble of byte 0.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SampleFlags: u8 {
        /// The stylus barrel (side) button is held.
        const BARREL = 1 << 4;
    }
}

const ACTION_MASK: u8 = 0x0F;

// ── StylusAction ─────────────────────────────────────────────────

/// Pointer phase of a stylus sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StylusAction {
    /// Tip touched the surface.
    Down = 0,
    /// Tip moved while touching.
    Move = 1,
    /// Tip lifted (or the gesture was cancelled).
    Up = 2,
    /// Stylus in range but not touching, and any other pointer action.
    Hover = 3,
}

impl StylusAction {
    /// `Down` and `Up` are state transitions and are never throttled.
    pub const fn is_transition(self) -> bool {
        matches!(self, Self::Down | Self::Up)
    }
}

impl TryFrom<u8> for StylusAction {
    type Error = MalformedPacket;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Down),
            1 => Ok(Self::Move),
            2 => Ok(Self::Up),
            3 => Ok(Self::Hover),
            other => Err(MalformedPacket::UnknownAction(other)),
        }
    }
}

// ── StylusSample ─────────────────────────────────────────────────

/// One stylus input event in device pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StylusSample {
    pub action: StylusAction,
    pub x: f32,
    pub y: f32,
    /// Normalised pressure, 0.0 – 1.0.
    pub pressure: f32,
    pub barrel_pressed: bool,
    /// Tilt towards +X in degrees.
    pub tilt_x: i16,
    /// Tilt towards +Y in degrees.
    pub tilt_y: i16,
}

impl StylusSample {
    /// Encoded size on the wire.
    pub const SIZE: usize = 17;

    /// Sample with no tilt and the barrel button released.
    pub fn new(action: StylusAction, x: f32, y: f32, pressure: f32) -> Self {
        Self {
            action,
            x,
            y,
            pressure,
            barrel_pressed: false,
            tilt_x: 0,
            tilt_y: 0,
        }
    }

    pub fn with_barrel(mut self, pressed: bool) -> Self {
        self.barrel_pressed = pressed;
        self
    }

    /// Set tilt from the platform's polar axes (radians).
    ///
    /// See [`decompose_tilt`].
    pub fn with_tilt(mut self, tilt: f32, orientation: f32) -> Self {
        (self.tilt_x, self.tilt_y) = decompose_tilt(tilt, orientation);
        self
    }

    fn flags(&self) -> SampleFlags {
        if self.barrel_pressed {
            SampleFlags::BARREL
        } else {
            SampleFlags::empty()
        }
    }

    /// Serialize to bytes (little-endian).
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.action as u8 | self.flags().bits();
        buf[1..5].copy_from_slice(&self.x.to_le_bytes());
        buf[5..9].copy_from_slice(&self.y.to_le_bytes());
        buf[9..13].copy_from_slice(&self.pressure.to_le_bytes());
        buf[13..15].copy_from_slice(&self.tilt_x.to_le_bytes());
        buf[15..17].copy_from_slice(&self.tilt_y.to_le_bytes());
        buf
    }

    /// Deserialize from bytes.
    pub fn decode(data: &[u8]) -> Result<Self, MalformedPacket> {
        if data.len() < Self::SIZE {
            return Err(MalformedPacket::Truncated {
                kind: "stylus sample",
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let mut buf = &data[..Self::SIZE];
        let head = buf.get_u8();
        let action = StylusAction::try_from(head & ACTION_MASK)?;
        let flags = SampleFlags::from_bits_truncate(head & !ACTION_MASK);

        Ok(Self {
            action,
            x: buf.get_f32_le(),
            y: buf.get_f32_le(),
            pressure: buf.get_f32_le(),
            barrel_pressed: flags.contains(SampleFlags::BARREL),
            tilt_x: buf.get_i16_le(),
            tilt_y: buf.get_i16_le(),
        })
    }
}

// ── Tilt ─────────────────────────────────────────────────────────

/// Split polar stylus tilt into per-axis degrees.
///
/// `tilt` is the angle from perpendicular (0 = upright, π/2 = flat) and
/// `orientation` the direction of the tilt, clockwise from vertical in
/// −π..π. Both results are bounded by ±90 so the `i16` cast cannot
/// overflow.
pub fn decompose_tilt(tilt: f32, orientation: f32) -> (i16, i16) {
    let degrees = tilt.to_degrees();
    let tilt_x = (degrees * orientation.sin()).round() as i16;
    let tilt_y = (degrees * orientation.cos()).round() as i16;
    (tilt_x, tilt_y)
}
