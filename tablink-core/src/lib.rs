//! # tablink-core
//!
//! UDP session and transport engine for TabLink, which turns a
//! touch/stylus device into a graphics tablet (and optional mirrored
//! display) for a host on the local network.
//!
//! This crate contains:
//! - **Codec**: fixed little-endian layouts for control, stylus and frame datagrams
//! - **Transport**: `UdpTransport`, a UDP socket with cancellable receive
//! - **Session**: `Engine` with handshake, heartbeat, dispatcher and sample sender
//! - **Throttle**: `SubmissionThrottle`, the 125 Hz sample submission boundary
//! - **Frame**: XOR-delta + zstd `FrameEncoder` / `FrameReconstructor`
//! - **Host**: `HostPeer`, the host end of a session
//! - **Error**: `TabLinkError`, a typed, `thiserror`-based error hierarchy

pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod host;
pub mod session;
pub mod throttle;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{
    ClientPacket, ControlMessage, DeviceDescriptor, FrameMessage, HostPacket, SampleFlags,
    StylusAction, StylusSample,
};
pub use config::{DEFAULT_PORT, EngineConfig};
pub use error::{FailureReason, FrameError, LossReason, MalformedPacket, TabLinkError};
pub use event::{EngineEvents, EngineStats, FrameSlot, SessionEvent};
pub use frame::{EncodedFrame, FrameEncoder, FrameReconstructor, ReconstructedFrame};
pub use host::{HostBehavior, HostPeer, HostRecord};
pub use session::{Engine, SessionState};
pub use throttle::SubmissionThrottle;
pub use transport::{Received, UdpTransport};
