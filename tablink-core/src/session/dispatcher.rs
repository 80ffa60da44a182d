//! Inbound dispatcher and frame pipeline.
//!
//! ```text
//! UdpTransport ──► dispatcher ──┬─ DeviceInfoAck ─► handshake
//!                               ├─ HeartbeatPong ─► last-pong
//!                               ├─ HeartbeatPing ─► reply pong
//!                               └─ FrameMessage ──► pipeline ──► watch
//! ```
//!
//! The dispatcher never blocks on frame work: frames are queued to the
//! pipeline task, which owns the [`FrameReconstructor`] and runs each
//! decompress/XOR pass on the blocking pool. The queue is bounded; a
//! frame that finds it full is dropped and counted as rejected.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

use crate::codec::{ClientPacket, ControlMessage, FrameMessage};
use crate::error::TabLinkError;
use crate::event::StatsCounters;
use crate::frame::FrameReconstructor;
use crate::session::link::SessionLink;
use crate::transport::{MAX_DATAGRAM_SIZE, Received, is_transient};

// ── Dispatcher ───────────────────────────────────────────────────

pub(crate) async fn run(link: Arc<SessionLink>, frames: mpsc::Sender<FrameMessage>) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let poll = link.config.receive_poll();
    let stats = &link.shared.stats;

    loop {
        let (from, len) = match link.transport.receive(&mut buf, poll).await {
            Ok(Received::Datagram { from, len }) => (from, len),
            Ok(Received::TimedOut) => continue,
            Ok(Received::Closed) => break,
            Err(TabLinkError::Transport(e)) if is_transient(&e) => {
                debug!(error = %e, "ignoring transient receive error");
                continue;
            }
            Err(e) => {
                if !link.is_cancelled() {
                    warn!(error = %e, "receive failed");
                    link.fail(e.to_string());
                }
                break;
            }
        };

        if from != link.peer {
            debug!(%from, "dropping datagram from unknown address");
            StatsCounters::bump(&stats.dropped_packets);
            continue;
        }

        let datagram = Bytes::copy_from_slice(&buf[..len]);
        match ClientPacket::decode(&datagram) {
            Ok(ClientPacket::Control(ControlMessage::DeviceInfoAck)) => link.acknowledge(),
            Ok(ClientPacket::Control(ControlMessage::HeartbeatPong)) => {
                trace!("pong");
                link.mark_pong();
            }
            Ok(ClientPacket::Control(ControlMessage::HeartbeatPing)) => {
                let pong = ControlMessage::HeartbeatPong.encode();
                if let Err(e) = link.transport.try_send_to(link.peer, &pong) {
                    debug!(error = %e, "pong not sent");
                }
            }
            Ok(ClientPacket::Frame(frame)) => match frames.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!("frame queue full, dropping frame");
                    StatsCounters::bump(&stats.frames_rejected);
                }
                Err(TrySendError::Closed(_)) => break,
            },
            Err(e) => {
                debug!(error = %e, len, "dropping malformed datagram");
                StatsCounters::bump(&stats.dropped_packets);
            }
        }
    }

    debug!("dispatcher stopped");
}

// ── Frame pipeline ───────────────────────────────────────────────

pub(crate) async fn run_frame_pipeline(
    link: Arc<SessionLink>,
    mut frames: mpsc::Receiver<FrameMessage>,
) {
    let stats = &link.shared.stats;
    let mut reconstructor = FrameReconstructor::with_limit(link.config.max_frame_bytes);

    loop {
        let msg = tokio::select! {
            biased;
            _ = link.cancel_token().cancelled() => break,
            msg = frames.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let job = tokio::task::spawn_blocking(move || {
            let result = reconstructor.on_frame_message(&msg);
            (reconstructor, result)
        });
        let (returned, result) = match job.await {
            Ok(done) => done,
            Err(e) => {
                warn!(error = %e, "frame reconstruction task failed");
                break;
            }
        };
        reconstructor = returned;

        match result {
            Ok(frame) => {
                trace!(width = frame.width, height = frame.height, "frame ready");
                StatsCounters::bump(&stats.frames_reconstructed);
                link.shared.publish_frame(frame);
            }
            Err(e) => {
                debug!(error = %e, "dropping frame");
                StatsCounters::bump(&stats.frames_rejected);
            }
        }
    }

    debug!("frame pipeline stopped");
}
