//! Sample sender: encodes a stylus sample and hands it to the socket
//! without waiting. Runs on the caller's thread.

use tracing::{debug, trace};

use crate::codec::StylusSample;
use crate::event::StatsCounters;
use crate::session::link::SessionLink;
use crate::session::state::SessionState;

/// Send `sample` if the session is Connected.
///
/// Returns `true` when the datagram reached the socket. A full socket
/// buffer drops the sample; samples are never queued or retried.
pub(crate) fn send_sample(link: &SessionLink, sample: &StylusSample) -> bool {
    if link.state() != SessionState::Connected {
        return false;
    }

    let stats = &link.shared.stats;
    match link.transport.try_send_to(link.peer, &sample.encode()) {
        Ok(true) => {
            StatsCounters::bump(&stats.samples_sent);
            true
        }
        Ok(false) => {
            trace!(action = ?sample.action, "socket busy, sample dropped");
            StatsCounters::bump(&stats.samples_dropped);
            false
        }
        Err(e) => {
            debug!(error = %e, "sample send failed");
            StatsCounters::bump(&stats.samples_dropped);
            false
        }
    }
}
