//! Scriptable transport for tests and simulator harnesses.
//!
//! A [`MockTransport`] forwards every sent datagram to a handler closure
//! that plays the agent: it returns the reply datagram, or drops the
//! request so the session's read deadline expires.

use super::Transport;
use crate::error::Result;
use std::collections::VecDeque;

/// What the scripted agent does with a request.
pub enum MockReply {
    /// Reply with this datagram.
    Data(Vec<u8>),
    /// Drop the request; the session times out waiting.
    Drop,
}

/// Scriptable in-memory transport.
pub struct MockTransport {
    handler: Box<dyn FnMut(&[u8]) -> MockReply + Send>,
    pending: VecDeque<Vec<u8>>,
    requests: Vec<Vec<u8>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("pending", &self.pending)
            .field("requests", &self.requests)
            .finish()
    }
}

impl MockTransport {
    /// Create a transport whose handler plays the agent.
    pub fn new(handler: impl FnMut(&[u8]) -> MockReply + Send + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            pending: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    /// Datagrams sent through this transport so far.
    pub fn requests(&self) -> &[Vec<u8>] {
        &self.requests
    }
}

impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.requests.push(data.to_vec());
        match (self.handler)(data) {
            MockReply::Data(reply) => self.pending.push_back(reply),
            MockReply::Drop => {}
        }
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.pending.pop_front() {
            Some(reply) => {
                let len = reply.len().min(buf.len());
                buf[..len].copy_from_slice(&reply[..len]);
                Ok(len)
            }
            // nothing queued: behave like a lost datagram and let the
            // caller's deadline expire
            None => std::future::pending().await,
        }
    }
}
