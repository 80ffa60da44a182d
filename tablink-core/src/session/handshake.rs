//! Client side of the device-info handshake.
//!
//! ```text
//! CLIENT                                HOST
//!   │── DeviceInfoRequest (0xFF) ─────►  │   attempt 1
//!   │        … interval …                │
//!   │── DeviceInfoRequest (0xFF) ─────►  │   attempt 2
//!   │◄──────────── DeviceInfoAck (0xFE) ─│
//!   │   Connected                        │
//! ```
//!
//! The ACK is picked up by the dispatcher, which runs for the whole
//! handshake; this loop only sends and waits.

use tracing::{debug, warn};

use crate::codec::DeviceDescriptor;
use crate::error::TabLinkError;
use crate::event::StatsCounters;
use crate::session::link::SessionLink;
use crate::transport::is_transient;

/// Send requests until one is acknowledged or the attempts run out.
pub(crate) async fn perform(link: &SessionLink, device: &DeviceDescriptor) -> Result<(), TabLinkError> {
    let request = device.encode_request();
    let attempts = link.config.handshake_attempts.max(1);
    let interval = link.config.handshake_interval();

    for attempt in 1..=attempts {
        debug!(attempt, peer = %link.peer, "sending device info request");
        StatsCounters::bump(&link.shared.stats.handshake_requests);
        match link.transport.send_to(link.peer, &request).await {
            Ok(()) => {}
            Err(TabLinkError::Transport(e)) if is_transient(&e) => {
                warn!(attempt, error = %e, "device info request not delivered");
            }
            Err(_) if link.is_cancelled() => return Err(link.interruption()),
            Err(e) => return Err(e),
        }

        tokio::select! {
            biased;
            _ = link.cancel_token().cancelled() => return Err(link.interruption()),
            _ = link.acknowledged() => {
                debug!(attempt, "device info acknowledged");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    Err(TabLinkError::HandshakeTimeout { attempts })
}
