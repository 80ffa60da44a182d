//! Caller-visible events, the frame-ready channel and engine statistics.
//!
//! Lifecycle events travel over an unbounded channel so no background
//! task ever waits on the caller. Reconstructed frames go through a
//! `watch` channel: a slow renderer only ever sees the newest frame.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};

use crate::error::{FailureReason, LossReason};
use crate::frame::ReconstructedFrame;

/// Latest reconstructed frame, `None` until the host sends one.
pub type FrameSlot = Option<Arc<ReconstructedFrame>>;

// ── SessionEvent ─────────────────────────────────────────────────

/// Lifecycle notification emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The handshake completed; samples may now be submitted.
    Connected(SocketAddr),
    /// A `connect()` call ended without reaching Connected.
    ConnectionFailed(FailureReason),
    /// An established session died. Emitted at most once per session.
    ConnectionLost(LossReason),
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected(peer) => write!(f, "connected to {peer}"),
            Self::ConnectionFailed(reason) => write!(f, "connection failed: {reason}"),
            Self::ConnectionLost(reason) => write!(f, "connection lost: {reason}"),
        }
    }
}

// ── EngineEvents ─────────────────────────────────────────────────

/// Receiving half handed out by [`Engine::new`](crate::Engine::new).
pub struct EngineEvents {
    events: mpsc::UnboundedReceiver<SessionEvent>,
    frames: watch::Receiver<FrameSlot>,
}

impl EngineEvents {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<SessionEvent>,
        frames: watch::Receiver<FrameSlot>,
    ) -> Self {
        Self { events, frames }
    }

    /// Wait for the next lifecycle event.
    ///
    /// Returns `None` once the engine has been dropped and every queued
    /// event was delivered.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Next queued event, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// A receiver that is notified whenever a new frame is ready.
    pub fn frames(&self) -> watch::Receiver<FrameSlot> {
        self.frames.clone()
    }

    /// The most recently reconstructed frame.
    pub fn latest_frame(&self) -> FrameSlot {
        self.frames.borrow().clone()
    }
}

// ── EngineStats ──────────────────────────────────────────────────

/// Point-in-time counters, see [`Engine::stats`](crate::Engine::stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Inbound datagrams discarded (malformed or from a foreign address).
    pub dropped_packets: u64,
    /// Handshake requests sent, over all sessions.
    pub handshake_requests: u64,
    /// Samples handed to the socket.
    pub samples_sent: u64,
    /// Samples rejected by the submission throttle.
    pub samples_throttled: u64,
    /// Samples lost because the socket buffer was full.
    pub samples_dropped: u64,
    /// Frames delivered to the frame channel.
    pub frames_reconstructed: u64,
    /// Frames discarded by the reconstructor.
    pub frames_rejected: u64,
}

/// Shared atomic counters behind [`EngineStats`].
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub dropped_packets: AtomicU64,
    pub handshake_requests: AtomicU64,
    pub samples_sent: AtomicU64,
    pub samples_throttled: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub frames_reconstructed: AtomicU64,
    pub frames_rejected: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStats {
        EngineStats {
            dropped_packets: self.dropped_packets.load(Ordering::Relaxed),
            handshake_requests: self.handshake_requests.load(Ordering::Relaxed),
            samples_sent: self.samples_sent.load(Ordering::Relaxed),
            samples_throttled: self.samples_throttled.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            frames_reconstructed: self.frames_reconstructed.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn event_display() {
        let e = SessionEvent::Connected("127.0.0.1:9999".parse().unwrap());
        assert_eq!(e.to_string(), "connected to 127.0.0.1:9999");

        let e = SessionEvent::ConnectionLost(LossReason::HeartbeatTimeout(Duration::from_secs(10)));
        assert!(e.to_string().starts_with("connection lost"));
    }

    #[test]
    fn counters_snapshot() {
        let counters = StatsCounters::default();
        StatsCounters::bump(&counters.dropped_packets);
        StatsCounters::bump(&counters.dropped_packets);
        StatsCounters::bump(&counters.samples_sent);

        let stats = counters.snapshot();
        assert_eq!(stats.dropped_packets, 2);
        assert_eq!(stats.samples_sent, 1);
        assert_eq!(stats.frames_rejected, 0);
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (_frame_tx, frame_rx) = watch::channel(None);
        let mut events = EngineEvents::new(rx, frame_rx);

        let peer: SocketAddr = "10.0.0.2:9999".parse().unwrap();
        tx.send(SessionEvent::Connected(peer)).unwrap();
        tx.send(SessionEvent::ConnectionLost(LossReason::Transport("gone".into())))
            .unwrap();

        assert_eq!(events.recv().await, Some(SessionEvent::Connected(peer)));
        assert!(matches!(
            events.try_recv(),
            Some(SessionEvent::ConnectionLost(_))
        ));
        assert!(events.try_recv().is_none());
        assert!(events.latest_frame().is_none());
    }
}
