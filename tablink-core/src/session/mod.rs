//! # Session engine
//!
//! [`Engine`] is the boundary the UI layer talks to. One engine drives at
//! most one session at a time:
//!
//! ```text
//! connect() ─► resolve ─► UdpTransport::open ─► spawn dispatcher + pipeline
//!                                              └► handshake ─► Connected
//!                                                              └► spawn heartbeat
//! ```
//!
//! | Module       | Purpose                                           |
//! |--------------|---------------------------------------------------|
//! | `state`      | `SessionState` and its atomic cell                |
//! | `link`       | State shared by one session's tasks               |
//! | `handshake`  | DeviceInfoRequest retry loop                      |
//! | `heartbeat`  | Ping / liveness monitor                           |
//! | `dispatcher` | Receive loop and frame pipeline                   |
//! | `sender`     | Non-blocking sample send                          |

mod dispatcher;
mod handshake;
mod heartbeat;
mod link;
mod sender;
pub mod state;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::codec::{DeviceDescriptor, StylusSample};
use crate::config::EngineConfig;
use crate::error::TabLinkError;
use crate::event::{EngineEvents, EngineStats, FrameSlot, SessionEvent, StatsCounters};
use crate::frame::ReconstructedFrame;
use crate::throttle::SubmissionThrottle;
use crate::transport::{UdpTransport, resolve_peer};

use link::SessionLink;
pub use state::SessionState;

// ── EngineShared ─────────────────────────────────────────────────

/// Outlets shared by the engine and every session it spawns.
pub(crate) struct EngineShared {
    events: mpsc::UnboundedSender<SessionEvent>,
    frames: watch::Sender<FrameSlot>,
    pub stats: StatsCounters,
}

impl EngineShared {
    pub fn emit(&self, event: SessionEvent) {
        // The caller may have dropped its receiver; events are then moot.
        let _ = self.events.send(event);
    }

    pub fn publish_frame(&self, frame: ReconstructedFrame) {
        self.frames.send_replace(Some(Arc::new(frame)));
    }
}

// ── Engine ───────────────────────────────────────────────────────

#[derive(Default)]
struct Slot {
    /// Bumped by every disconnect so a `connect()` that lost a race
    /// never installs its session.
    generation: u64,
    active: Option<Arc<SessionLink>>,
}

/// Client-side UDP session engine.
pub struct Engine {
    config: EngineConfig,
    shared: Arc<EngineShared>,
    slot: Mutex<Slot>,
    throttle: Mutex<SubmissionThrottle>,
}

impl Engine {
    /// Create an engine and the receiving half of its event surface.
    pub fn new(config: EngineConfig) -> (Self, EngineEvents) {
        let config = config.sanitized();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = watch::channel(None);

        let engine = Self {
            throttle: Mutex::new(SubmissionThrottle::new(config.sample_interval())),
            config,
            shared: Arc::new(EngineShared {
                events: event_tx,
                frames: frame_tx,
                stats: StatsCounters::default(),
            }),
            slot: Mutex::new(Slot::default()),
        };
        (engine, EngineEvents::new(event_rx, frame_rx))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Connect to the host at `address` and perform the handshake.
    ///
    /// Any existing session is disconnected first. On success the
    /// resolved peer is returned and `Connected` emitted; on failure
    /// `ConnectionFailed` is emitted, except when a newer `connect()` or
    /// a `disconnect()` cancelled this one.
    pub async fn connect(
        &self,
        address: &str,
        device: DeviceDescriptor,
    ) -> Result<SocketAddr, TabLinkError> {
        let result = self.establish(address, device).await;
        if let Err(e) = &result {
            match e.failure_reason() {
                Some(reason) => {
                    warn!(%address, %reason, "connection failed");
                    self.shared.emit(SessionEvent::ConnectionFailed(reason));
                }
                None => debug!(%address, "connect cancelled"),
            }
        }
        result
    }

    async fn establish(
        &self,
        address: &str,
        device: DeviceDescriptor,
    ) -> Result<SocketAddr, TabLinkError> {
        let generation = self.teardown();

        let peer = resolve_peer(address, self.config.default_port).await?;
        let transport = UdpTransport::open(peer).await?;
        info!(%peer, local = ?transport.local_addr().ok(), ?device, "connecting");

        let link = Arc::new(SessionLink::new(
            transport,
            peer,
            self.config.clone(),
            Arc::clone(&self.shared),
        ));
        self.install(&link, generation)?;

        let (frame_tx, frame_rx) = mpsc::channel(self.config.frame_queue_depth);
        tokio::spawn(dispatcher::run(Arc::clone(&link), frame_tx));
        tokio::spawn(dispatcher::run_frame_pipeline(Arc::clone(&link), frame_rx));

        let outcome = match handshake::perform(&link, &device).await {
            Ok(()) if link.promote() => Ok(peer),
            Ok(()) => Err(link.interruption()),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            link.shutdown();
            self.uninstall(&link);
            return Err(e);
        }

        self.lock_throttle().reset();
        info!(%peer, "connected");
        self.shared.emit(SessionEvent::Connected(peer));
        tokio::spawn(heartbeat::run(Arc::clone(&link)));
        Ok(peer)
    }

    /// Tear down the current session, if any, and return to Idle.
    ///
    /// Idempotent and safe before any `connect()`. Emits no event.
    pub fn disconnect(&self) {
        self.teardown();
    }

    /// Submit one stylus sample.
    ///
    /// No-op unless Connected. Move/Hover samples inside the throttle
    /// window are discarded. Returns whether the sample was sent.
    pub fn submit_stylus_sample(&self, sample: StylusSample) -> bool {
        let Some(link) = self.active() else {
            return false;
        };
        if !link.state().is_connected() {
            return false;
        }
        if !self.lock_throttle().admit(sample.action) {
            StatsCounters::bump(&self.shared.stats.samples_throttled);
            return false;
        }
        sender::send_sample(&link, &sample)
    }

    /// Current session state; `Idle` when there is no session.
    pub fn state(&self) -> SessionState {
        self.active()
            .map_or(SessionState::Idle, |link| link.state())
    }

    /// Endpoint of the current session.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.active().map(|link| link.peer)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> EngineStats {
        self.shared.stats.snapshot()
    }

    // ── Slot management ──────────────────────────────────────────

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_throttle(&self) -> MutexGuard<'_, SubmissionThrottle> {
        self.throttle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self) -> Option<Arc<SessionLink>> {
        self.lock_slot().active.clone()
    }

    /// Drop the current session and start a new generation.
    fn teardown(&self) -> u64 {
        let (previous, generation) = {
            let mut slot = self.lock_slot();
            slot.generation += 1;
            (slot.active.take(), slot.generation)
        };
        if let Some(link) = previous {
            info!(peer = %link.peer, state = %link.state(), "disconnecting");
            link.shutdown();
        }
        generation
    }

    fn install(&self, link: &Arc<SessionLink>, generation: u64) -> Result<(), TabLinkError> {
        let mut slot = self.lock_slot();
        if slot.generation != generation {
            link.shutdown();
            return Err(TabLinkError::Cancelled);
        }
        slot.active = Some(Arc::clone(link));
        Ok(())
    }

    fn uninstall(&self, link: &Arc<SessionLink>) {
        let mut slot = self.lock_slot();
        if slot
            .active
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, link))
        {
            slot.active = None;
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_engine_is_idle() {
        let (engine, mut events) = Engine::new(EngineConfig::default());
        assert_eq!(engine.state(), SessionState::Idle);
        assert_eq!(engine.peer(), None);
        assert_eq!(engine.stats(), EngineStats::default());
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn disconnect_before_connect_is_harmless() {
        let (engine, mut events) = Engine::new(EngineConfig::default());
        engine.disconnect();
        engine.disconnect();
        assert_eq!(engine.state(), SessionState::Idle);
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn submit_while_idle_is_a_no_op() {
        let (engine, _events) = Engine::new(EngineConfig::default());
        let sample = StylusSample::new(crate::codec::StylusAction::Down, 1.0, 2.0, 0.5);
        assert!(!engine.submit_stylus_sample(sample));
        assert_eq!(engine.stats().samples_throttled, 0);
        assert_eq!(engine.stats().samples_sent, 0);
    }

    #[tokio::test]
    async fn invalid_address_reports_failure() {
        let (engine, mut events) = Engine::new(EngineConfig::default());
        let err = engine
            .connect("", DeviceDescriptor::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TabLinkError::InvalidAddress(_)));
        assert!(matches!(
            events.recv().await,
            Some(SessionEvent::ConnectionFailed(
                crate::error::FailureReason::InvalidAddress(_)
            ))
        ));
        assert_eq!(engine.state(), SessionState::Idle);
    }
}
