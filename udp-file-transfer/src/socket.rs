//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that adds an
//! optional receive timeout. Decoding is left to the caller: a datagram that
//! fails to parse is a protocol event (treated as corruption), not an I/O
//! error. All protocol logic lives elsewhere; this module owns only byte I/O.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};

use crate::packet::MAX_DATAGRAM;

/// Outcome of a receive with a timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recv {
    Datagram { bytes: Vec<u8>, from: SocketAddr },
    TimedOut,
}

/// An async, datagram-oriented UDP socket.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        log::debug!("socket bound to {local_addr}");
        Ok(Self { local_addr, inner })
    }

    /// Send `bytes` as a single datagram to `dest`.
    pub async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> io::Result<()> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }

    /// Wait for the next datagram.
    ///
    /// With `timeout = None` this blocks until something arrives; otherwise
    /// it gives up after `timeout` and returns [`Recv::TimedOut`].
    pub async fn recv_from(&self, timeout: Option<Duration>) -> io::Result<Recv> {
        // One spare byte, so an oversized datagram stays detectably oversized
        // instead of being truncated to a valid-looking frame.
        let mut buf = vec![0u8; MAX_DATAGRAM + 1];
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.inner.recv_from(&mut buf)).await {
                Ok(result) => result?,
                Err(_) => return Ok(Recv::TimedOut),
            },
            None => self.inner.recv_from(&mut buf).await?,
        };
        let (n, from) = received;
        buf.truncate(n);
        Ok(Recv::Datagram { bytes: buf, from })
    }
}

/// Resolve `host:port` to the first matching socket address.
pub async fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    lookup_host((host, port)).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {host}"),
        )
    })
}
