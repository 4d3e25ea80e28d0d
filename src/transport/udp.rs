//! UDP transport: one connected socket per session.

use super::Transport;
use crate::error::{Error, Result};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Connected UDP transport.
///
/// Bound to an ephemeral local port and `connect`ed to the peer, so the
/// kernel filters datagrams from other sources.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Dial the peer address (e.g. `"192.0.2.1:161"`).
    ///
    /// Name resolution happens here; the first resolved address decides
    /// the address family of the local socket.
    pub async fn connect(address: &str) -> Result<Self> {
        let mut addrs = tokio::net::lookup_host(address).await.map_err(|source| {
            Error::Io { source }
        })?;
        let peer = addrs.next().ok_or_else(|| Error::Io {
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no addresses for {}", address),
            ),
        })?;

        let bind_addr: SocketAddr = if peer.is_ipv6() {
            "[::]:0".parse().expect("valid literal")
        } else {
            "0.0.0.0:0".parse().expect("valid literal")
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(peer).await?;

        tracing::debug!(
            target: "snmp_session::transport",
            local = %socket.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            peer = %peer,
            "UDP socket connected"
        );

        Ok(Self { socket, peer })
    }

    /// The peer address this transport sends to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.socket.send(data).await?;
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = self.socket.recv(buf).await?;
        Ok(len)
    }
}
