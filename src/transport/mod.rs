//! Transport layer abstraction.
//!
//! A session owns exactly one connected datagram transport and uses it
//! strictly serially: one send, at most one receive, per attempt. Deadlines
//! are applied by the session (`tokio::time::timeout`), not the transport.

mod mock;
mod udp;

pub use mock::{MockReply, MockTransport};
pub use udp::UdpTransport;

use crate::error::Result;
use std::future::Future;

/// Connected datagram transport.
///
/// Implementations exchange whole datagrams with a single fixed peer.
pub trait Transport: Send {
    /// Send one datagram to the peer.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Receive one datagram from the peer into `buf`, returning its length.
    ///
    /// Datagrams longer than `buf` are truncated to fit, matching recvfrom
    /// semantics.
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize>> + Send;
}
