//! Heartbeat monitor.
//!
//! Runs while the session is Connected. Each tick it checks how long the
//! host has been silent; past the timeout the session is lost, otherwise
//! a HeartbeatPing goes out. The first tick fires one interval after the
//! handshake, never immediately.

use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::codec::ControlMessage;
use crate::error::{LossReason, TabLinkError};
use crate::session::link::SessionLink;
use crate::transport::is_transient;

pub(crate) async fn run(link: Arc<SessionLink>) {
    let period = link.config.heartbeat_interval();
    let timeout = link.config.heartbeat_timeout();
    let ping = ControlMessage::HeartbeatPing.encode();

    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = link.cancel_token().cancelled() => break,
            _ = ticker.tick() => {}
        }

        let silent = link.since_last_pong();
        if silent > timeout {
            debug!(?silent, "heartbeat timeout");
            link.lose(LossReason::HeartbeatTimeout(timeout));
            break;
        }

        match link.transport.send_to(link.peer, &ping).await {
            Ok(()) => trace!(peer = %link.peer, "ping"),
            Err(TabLinkError::Transport(e)) if is_transient(&e) => {
                warn!(error = %e, "heartbeat ping not delivered");
            }
            Err(e) => {
                link.lose(LossReason::Transport(e.to_string()));
                break;
            }
        }
    }

    debug!("heartbeat monitor stopped");
}
