//! State shared by the activities of one session.
//!
//! A [`SessionLink`] is created per `connect()` and handed (behind an
//! `Arc`) to the dispatcher, heartbeat and frame pipeline tasks. Only
//! the state and the last-pong timestamp are written by more than one
//! task; both are atomics.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::{LossReason, TabLinkError};
use crate::event::SessionEvent;
use crate::session::EngineShared;
use crate::session::state::{AtomicSessionState, SessionState};
use crate::transport::UdpTransport;

pub(crate) struct SessionLink {
    pub transport: UdpTransport,
    pub peer: SocketAddr,
    pub config: EngineConfig,
    pub shared: Arc<EngineShared>,
    state: AtomicSessionState,
    /// Milliseconds since `epoch` at which the last pong arrived.
    last_pong_ms: AtomicU64,
    epoch: Instant,
    cancel: CancellationToken,
    ack: Notify,
    /// Socket failure that ended a handshake.
    failure: Mutex<Option<String>>,
}

impl SessionLink {
    pub fn new(
        transport: UdpTransport,
        peer: SocketAddr,
        config: EngineConfig,
        shared: Arc<EngineShared>,
    ) -> Self {
        Self {
            transport,
            peer,
            config,
            shared,
            state: AtomicSessionState::new(SessionState::Handshaking),
            last_pong_ms: AtomicU64::new(0),
            epoch: Instant::now(),
            cancel: CancellationToken::new(),
            ack: Notify::new(),
            failure: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    // ── Handshake ────────────────────────────────────────────────

    /// Record an inbound DeviceInfoAck. Only the first one while
    /// Handshaking matters; later ones are no-ops.
    pub fn acknowledge(&self) {
        if self.state() == SessionState::Handshaking {
            self.ack.notify_one();
        }
    }

    /// Resolves once an ACK has been recorded.
    pub async fn acknowledged(&self) {
        self.ack.notified().await
    }

    /// Handshaking → Connected, seeding the liveness clock.
    pub fn promote(&self) -> bool {
        self.mark_pong();
        self.state
            .transition(SessionState::Handshaking, SessionState::Connected)
    }

    /// The error to report when the handshake was cut short.
    pub fn interruption(&self) -> TabLinkError {
        let failure = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match failure {
            Some(msg) => TabLinkError::Transport(io::Error::other(msg)),
            None => TabLinkError::Cancelled,
        }
    }

    // ── Liveness ─────────────────────────────────────────────────

    pub fn mark_pong(&self) {
        let now = self.epoch.elapsed().as_millis() as u64;
        self.last_pong_ms.store(now, Ordering::Release);
    }

    /// Time since the last pong (or since the handshake completed).
    pub fn since_last_pong(&self) -> Duration {
        let last = Duration::from_millis(self.last_pong_ms.load(Ordering::Acquire));
        self.epoch.elapsed().saturating_sub(last)
    }

    // ── Teardown ─────────────────────────────────────────────────

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Connected → Closed with a single `ConnectionLost` event.
    ///
    /// Safe to call from any task, including the heartbeat monitor and
    /// the dispatcher at the same time.
    pub fn lose(&self, reason: LossReason) {
        if self
            .state
            .transition(SessionState::Connected, SessionState::Closed)
        {
            warn!(peer = %self.peer, %reason, "session lost");
            self.shared.emit(SessionEvent::ConnectionLost(reason));
            self.stop();
        }
    }

    /// A socket error ended the receive loop.
    pub fn fail(&self, error: String) {
        match self.state() {
            SessionState::Connected => self.lose(LossReason::Transport(error)),
            SessionState::Handshaking => {
                *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
                self.shutdown();
            }
            SessionState::Idle | SessionState::Closed => {}
        }
    }

    /// Explicit teardown: no event, state Closed.
    pub fn shutdown(&self) {
        self.state.replace(SessionState::Closed);
        self.stop();
    }

    fn stop(&self) {
        self.cancel.cancel();
        self.transport.close();
    }
}
