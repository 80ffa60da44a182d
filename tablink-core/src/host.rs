//! Host endpoint.
//!
//! [`HostPeer`] is the other end of a session: it answers handshakes and
//! pings, collects the stylus samples a client sends, and pushes screen
//! frames back. The `tablink-host` binary wraps it; the integration
//! tests use it with [`HostBehavior`] knobs to simulate silent or slow
//! hosts.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::codec::{ControlMessage, DeviceDescriptor, FrameMessage, HostPacket, StylusSample};
use crate::error::TabLinkError;
use crate::transport::{MAX_DATAGRAM_SIZE, Received, UdpTransport, is_transient};

const POLL: Duration = Duration::from_millis(200);

/// Request arrival times kept in [`HostRecord::requests`].
pub const REQUEST_HISTORY: usize = 64;
/// Samples kept in [`HostRecord::samples`].
pub const SAMPLE_HISTORY: usize = 256;

// ── HostBehavior ─────────────────────────────────────────────────

/// How the host reacts to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBehavior {
    /// Acknowledge the Nth DeviceInfoRequest and every later one.
    /// `None` never acknowledges.
    pub ack_after: Option<u32>,
    /// Reply to HeartbeatPing with HeartbeatPong.
    pub answer_pings: bool,
}

impl Default for HostBehavior {
    fn default() -> Self {
        Self {
            ack_after: Some(1),
            answer_pings: true,
        }
    }
}

impl HostBehavior {
    /// A host that never answers anything.
    pub fn silent() -> Self {
        Self {
            ack_after: None,
            answer_pings: false,
        }
    }
}

// ── HostRecord ───────────────────────────────────────────────────

/// What the host has observed so far: running counters plus a bounded
/// window of recent requests and samples.
#[derive(Debug, Clone, Default)]
pub struct HostRecord {
    /// DeviceInfoRequests received in total.
    pub request_count: u32,
    /// Arrival times of the latest [`REQUEST_HISTORY`] requests.
    pub requests: VecDeque<Instant>,
    /// Descriptor from the latest request.
    pub descriptor: Option<DeviceDescriptor>,
    /// Address of the client that last sent a request.
    pub client: Option<SocketAddr>,
    /// Stylus samples received in total.
    pub sample_count: u64,
    /// The latest [`SAMPLE_HISTORY`] samples, oldest first.
    pub samples: VecDeque<StylusSample>,
    pub pings: u64,
    pub pongs: u64,
    pub malformed: u64,
}

// ── HostPeer ─────────────────────────────────────────────────────

/// A bound host socket with its receive loop running.
pub struct HostPeer {
    transport: Arc<UdpTransport>,
    behavior: Arc<Mutex<HostBehavior>>,
    record: watch::Receiver<HostRecord>,
}

impl HostPeer {
    /// Bind `addr` and start serving.
    pub async fn bind(addr: SocketAddr, behavior: HostBehavior) -> Result<Self, TabLinkError> {
        let transport = Arc::new(UdpTransport::bind(addr).await?);
        let behavior = Arc::new(Mutex::new(behavior));
        let (record_tx, record_rx) = watch::channel(HostRecord::default());

        info!(local = %transport.local_addr()?, "host listening");
        tokio::spawn(serve(
            Arc::clone(&transport),
            Arc::clone(&behavior),
            record_tx,
        ));

        Ok(Self {
            transport,
            behavior,
            record: record_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TabLinkError> {
        self.transport.local_addr()
    }

    /// Change how the host reacts from now on.
    pub fn set_behavior(&self, behavior: HostBehavior) {
        *self.behavior.lock().unwrap_or_else(PoisonError::into_inner) = behavior;
    }

    /// Copy of everything observed so far.
    pub fn record(&self) -> HostRecord {
        self.record.borrow().clone()
    }

    /// Wait until `done` holds for the record, or `timeout` elapses.
    pub async fn wait_for(
        &self,
        timeout: Duration,
        mut done: impl FnMut(&HostRecord) -> bool,
    ) -> Option<HostRecord> {
        let mut record = self.record.clone();
        let waited = tokio::time::timeout(timeout, record.wait_for(|r| done(r))).await;
        match waited {
            Ok(Ok(r)) => Some(r.clone()),
            _ => None,
        }
    }

    /// Inspect the record in place without copying it.
    pub fn with_record<T>(&self, f: impl FnOnce(&HostRecord) -> T) -> T {
        f(&self.record.borrow())
    }

    /// Address of the client, once one has sent a handshake request.
    pub fn client(&self) -> Option<SocketAddr> {
        self.record.borrow().client
    }

    /// Send one frame to the current client.
    pub async fn send_frame(&self, frame: &FrameMessage) -> Result<(), TabLinkError> {
        let client = self.client().ok_or(TabLinkError::NotConnected)?;
        if frame.encoded_len() > MAX_DATAGRAM_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {} bytes exceeds one datagram", frame.encoded_len()),
            )
            .into());
        }
        self.transport.send_to(client, &frame.encode()).await
    }

    /// Send a control message to the current client.
    pub async fn send_control(&self, msg: ControlMessage) -> Result<(), TabLinkError> {
        let client = self.client().ok_or(TabLinkError::NotConnected)?;
        self.transport.send_to(client, &msg.encode()).await
    }

    /// Send raw bytes to the current client.
    pub async fn send_raw(&self, data: &[u8]) -> Result<(), TabLinkError> {
        let client = self.client().ok_or(TabLinkError::NotConnected)?;
        self.transport.send_to(client, data).await
    }

    /// Stop serving. Idempotent.
    pub fn close(&self) {
        self.transport.close();
    }
}

impl Drop for HostPeer {
    fn drop(&mut self) {
        self.transport.close();
    }
}

// ── Receive loop ─────────────────────────────────────────────────

async fn serve(
    transport: Arc<UdpTransport>,
    behavior: Arc<Mutex<HostBehavior>>,
    record: watch::Sender<HostRecord>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (from, len) = match transport.receive(&mut buf, POLL).await {
            Ok(Received::Datagram { from, len }) => (from, len),
            Ok(Received::TimedOut) => continue,
            Ok(Received::Closed) => break,
            Err(TabLinkError::Transport(e)) if is_transient(&e) => continue,
            Err(e) => {
                warn!(error = %e, "host receive failed");
                break;
            }
        };

        let policy = *behavior.lock().unwrap_or_else(PoisonError::into_inner);
        let reply = match HostPacket::decode(&buf[..len]) {
            Ok(HostPacket::DeviceInfoRequest(descriptor)) => {
                let mut count = 0;
                record.send_modify(|r| {
                    push_bounded(&mut r.requests, Instant::now(), REQUEST_HISTORY);
                    r.request_count = r.request_count.saturating_add(1);
                    r.descriptor = Some(descriptor);
                    r.client = Some(from);
                    count = r.request_count;
                });
                debug!(%from, attempt = count, ?descriptor, "device info request");
                policy
                    .ack_after
                    .is_some_and(|n| count >= n)
                    .then_some(ControlMessage::DeviceInfoAck)
            }
            Ok(HostPacket::Sample(sample)) => {
                trace!(?sample, "stylus sample");
                record.send_modify(|r| {
                    push_bounded(&mut r.samples, sample, SAMPLE_HISTORY);
                    r.sample_count += 1;
                });
                None
            }
            Ok(HostPacket::Control(ControlMessage::HeartbeatPing)) => {
                record.send_modify(|r| r.pings += 1);
                policy
                    .answer_pings
                    .then_some(ControlMessage::HeartbeatPong)
            }
            Ok(HostPacket::Control(ControlMessage::HeartbeatPong)) => {
                record.send_modify(|r| r.pongs += 1);
                None
            }
            Ok(HostPacket::Control(ControlMessage::DeviceInfoAck)) => None,
            Err(e) => {
                debug!(%from, error = %e, "dropping malformed datagram");
                record.send_modify(|r| r.malformed += 1);
                None
            }
        };

        if let Some(msg) = reply {
            if let Err(e) = transport.send_to(from, &msg.encode()).await {
                warn!(%from, error = %e, "host reply failed");
            }
        }
    }
    debug!("host stopped");
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, cap: usize) {
    if queue.len() == cap {
        queue.pop_front();
    }
    queue.push_back(item);
}
