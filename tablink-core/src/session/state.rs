//! Session lifecycle state.
//!
//! ```text
//!  Idle ──► Handshaking ──► Connected ──► Closed
//!   ▲            │                           │
//!   └────────────┴─────── disconnect ────────┘
//! ```
//!
//! The state is read by the caller's thread (sample submission) and
//! written by the dispatcher and heartbeat tasks, so it lives in an
//! atomic and every transition is a compare-and-swap.

use std::sync::atomic::{AtomicU8, Ordering};

// ── SessionState ─────────────────────────────────────────────────

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    /// No session. Initial state and the state after `disconnect()`.
    #[default]
    Idle = 0,

    /// Device info requests are being sent; waiting for an ACK.
    Handshaking = 1,

    /// ACK received; heartbeat running, samples accepted.
    Connected = 2,

    /// The session died (heartbeat timeout or socket failure).
    Closed = 3,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Handshaking => write!(f, "Handshaking"),
            Self::Connected => write!(f, "Connected"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl SessionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether `self → next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Handshaking)
                | (Self::Handshaking, Self::Connected)
                | (Self::Handshaking, Self::Idle)
                | (Self::Handshaking, Self::Closed)
                | (Self::Connected, Self::Closed)
                | (Self::Closed, Self::Idle)
        )
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Handshaking,
            2 => Self::Connected,
            3 => Self::Closed,
            _ => Self::Idle,
        }
    }
}

// ── AtomicSessionState ───────────────────────────────────────────

/// Lock-free cell holding a [`SessionState`].
#[derive(Debug)]
pub(crate) struct AtomicSessionState(AtomicU8);

impl AtomicSessionState {
    pub fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move `from → to` if the cell still holds `from`.
    ///
    /// Returns `false` when another task got there first or the edge is
    /// not part of the lifecycle.
    pub fn transition(&self, from: SessionState, to: SessionState) -> bool {
        if !from.can_transition_to(to) {
            return false;
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Force the state, returning the previous one.
    pub fn replace(&self, state: SessionState) -> SessionState {
        SessionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel))
    }
}
