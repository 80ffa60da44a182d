//! UDP transport: raw datagram send / receive with cancellable receive.
//!
//! The transport knows nothing about message types. It binds an
//! ephemeral port, sends fire-and-forget datagrams, and receives with a
//! timeout. [`close`](UdpTransport::close) may be called from any task
//! and wakes an in-flight [`receive`](UdpTransport::receive) at once.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::error::TabLinkError;

/// Largest payload a UDP/IPv4 datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Whether a socket error only reflects an ICMP report from an earlier
/// datagram. Such errors say nothing about the local socket.
pub fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused | io::ErrorKind::Interrupted
    )
}

/// Resolve a user-supplied host address.
///
/// Accepts `ip:port`, a bare IP, `name:port` or a bare host name; bare
/// forms use `default_port`.
pub async fn resolve_peer(address: &str, default_port: u16) -> Result<SocketAddr, TabLinkError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(TabLinkError::InvalidAddress("empty address".into()));
    }
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = address.trim_matches(['[', ']']).parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let has_port = address
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    let target = if has_port {
        address.to_owned()
    } else {
        format!("{address}:{default_port}")
    };

    tokio::net::lookup_host(target)
        .await
        .map_err(|e| TabLinkError::InvalidAddress(format!("{address}: {e}")))?
        .next()
        .ok_or_else(|| TabLinkError::InvalidAddress(format!("{address}: no addresses found")))
}

// ── Received ─────────────────────────────────────────────────────

/// Outcome of a single [`UdpTransport::receive`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// `len` bytes were written to the caller's buffer.
    Datagram { from: SocketAddr, len: usize },
    /// Nothing arrived within the timeout.
    TimedOut,
    /// The transport was closed before or during the wait.
    Closed,
}

// ── UdpTransport ─────────────────────────────────────────────────

/// A UDP socket with close-from-anywhere semantics.
pub struct UdpTransport {
    socket: UdpSocket,
    closed: CancellationToken,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl UdpTransport {
    /// Bind an ephemeral local port in the same address family as `peer`.
    pub async fn open(peer: SocketAddr) -> Result<Self, TabLinkError> {
        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        Self::bind(local).await
    }

    /// Bind to an explicit local address (hosts use a fixed port).
    ///
    /// Waits for the first write readiness so [`try_send_to`](Self::try_send_to)
    /// does not report a fresh socket as full.
    pub async fn bind(local: SocketAddr) -> Result<Self, TabLinkError> {
        let socket = UdpSocket::bind(local).await?;
        socket.writable().await?;
        Ok(Self {
            socket,
            closed: CancellationToken::new(),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        })
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TabLinkError> {
        Ok(self.socket.local_addr()?)
    }

    /// Send one datagram. No delivery guarantee and no retry.
    pub async fn send_to(&self, to: SocketAddr, data: &[u8]) -> Result<(), TabLinkError> {
        self.ensure_open()?;
        let sent = self.socket.send_to(data, to).await?;
        self.bytes_sent.fetch_add(sent as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Send one datagram without waiting for socket readiness.
    ///
    /// Returns `Ok(false)` when the socket buffer is full and the datagram
    /// was dropped.
    pub fn try_send_to(&self, to: SocketAddr, data: &[u8]) -> Result<bool, TabLinkError> {
        self.ensure_open()?;
        match self.socket.try_send_to(data, to) {
            Ok(sent) => {
                self.bytes_sent.fetch_add(sent as u64, Ordering::Relaxed);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Wait up to `timeout` for one datagram.
    pub async fn receive(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Received, TabLinkError> {
        if self.closed.is_cancelled() {
            return Ok(Received::Closed);
        }

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Ok(Received::Closed),
            result = tokio::time::timeout(timeout, self.socket.recv_from(buf)) => match result {
                Ok(Ok((len, from))) => {
                    self.bytes_received.fetch_add(len as u64, Ordering::Relaxed);
                    Ok(Received::Datagram { from, len })
                }
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Ok(Received::TimedOut),
            },
        }
    }

    /// Close the transport. Idempotent; wakes any pending receive.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Total bytes handed to the socket.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Total bytes received from the socket.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    fn ensure_open(&self) -> Result<(), TabLinkError> {
        if self.closed.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport closed").into());
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    async fn loopback() -> UdpTransport {
        UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn send_receive() {
        let a = loopback().await;
        let b = loopback().await;
        let b_addr = b.local_addr().unwrap();

        a.send_to(b_addr, b"hello").await.unwrap();

        let mut buf = [0u8; 64];
        let got = b.receive(&mut buf, Duration::from_secs(2)).await.unwrap();
        assert_eq!(
            got,
            Received::Datagram {
                from: a.local_addr().unwrap(),
                len: 5
            }
        );
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(a.bytes_sent(), 5);
        assert_eq!(b.bytes_received(), 5);
    }

    #[tokio::test]
    async fn try_send_delivers_on_a_fresh_socket() {
        let a = loopback().await;
        let b = loopback().await;

        // First use of `a`: nothing has awaited on it yet.
        assert!(a.try_send_to(b.local_addr().unwrap(), &[1, 2, 3]).unwrap());
        assert_eq!(a.bytes_sent(), 3);

        let mut buf = [0u8; 8];
        let got = b.receive(&mut buf, Duration::from_secs(2)).await.unwrap();
        assert!(matches!(got, Received::Datagram { len: 3, .. }));
    }

    #[tokio::test]
    async fn receive_times_out() {
        let t = loopback().await;
        let mut buf = [0u8; 8];
        let got = t.receive(&mut buf, Duration::from_millis(50)).await.unwrap();
        assert_eq!(got, Received::TimedOut);
    }

    #[tokio::test]
    async fn close_unblocks_receive() {
        let t = Arc::new(loopback().await);
        let waiter = {
            let t = Arc::clone(&t);
            tokio::spawn(async move {
                let mut buf = [0u8; 8];
                let started = Instant::now();
                let got = t.receive(&mut buf, Duration::from_secs(30)).await.unwrap();
                (got, started.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        t.close();

        let (got, waited) = waiter.await.unwrap();
        assert_eq!(got, Received::Closed);
        assert!(waited < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn resolves_addresses() {
        let addr = resolve_peer("192.168.1.20:7000", 9999).await.unwrap();
        assert_eq!(addr, "192.168.1.20:7000".parse().unwrap());

        let addr = resolve_peer(" 10.0.0.5 ", 9999).await.unwrap();
        assert_eq!(addr, "10.0.0.5:9999".parse().unwrap());

        let addr = resolve_peer("::1", 9999).await.unwrap();
        assert_eq!(addr, "[::1]:9999".parse().unwrap());

        let addr = resolve_peer("localhost", 4242).await.unwrap();
        assert_eq!(addr.port(), 4242);
        assert!(addr.ip().is_loopback());

        let addr = resolve_peer("localhost:4243", 9999).await.unwrap();
        assert_eq!(addr.port(), 4243);
        assert!(addr.ip().is_loopback());

        assert!(matches!(
            resolve_peer("", 9999).await,
            Err(TabLinkError::InvalidAddress(_))
        ));
    }

    #[test]
    fn transient_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[tokio::test]
    async fn closed_transport_rejects_sends() {
        let a = loopback().await;
        let b = loopback().await;
        a.close();
        a.close();
        assert!(a.is_closed());
        assert!(a.send_to(b.local_addr().unwrap(), b"x").await.is_err());
        assert!(a.try_send_to(b.local_addr().unwrap(), b"x").is_err());

        let mut buf = [0u8; 8];
        let got = a.receive(&mut buf, Duration::from_secs(1)).await.unwrap();
        assert_eq!(got, Received::Closed);
    }
}
