//! Transport seam between the protocol engines and the network stack
//!
//! The engines never own sockets. They consume these traits, which model
//! the callback surface of a small embedded IP stack: a single poll call
//! per loop iteration delivers everything that happened since the last
//! one, writes go through a bounded per-connection send queue, and the
//! `Sent` event reports how many queued bytes the stack has taken off our
//! hands. `netif` implements the traits over non-blocking `std::net`
//! sockets; `mock` implements them in memory with scriptable ack timing
//! for tests.

use crate::error::Result;
use std::net::SocketAddr;

pub mod mock;
pub mod netif;

pub use mock::{MockDatagramTransport, MockStreamTransport};
pub use netif::{TcpEndpoint, UdpEndpoint};

/// Identifier of one accepted stream connection
pub type ConnId = u64;

/// One received datagram
#[derive(Debug, Clone)]
pub struct Datagram {
    pub source: SocketAddr,
    pub payload: Vec<u8>,
}

/// Events a stream transport delivers from `poll`
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A client connected
    Accepted(ConnId),
    /// Bytes arrived on a connection
    Data(ConnId, Vec<u8>),
    /// The stack confirmed `n` previously enqueued bytes as sent
    Sent(ConnId, usize),
    /// The peer closed or the connection failed
    Closed(ConnId),
}

/// Connectionless datagram facility (lease responder side)
pub trait DatagramTransport {
    /// Drain everything received since the last poll into `out`
    fn poll(&mut self, out: &mut Vec<Datagram>) -> Result<()>;

    /// Send one payload to the limited-broadcast address on `port`
    fn send_broadcast(&mut self, port: u16, payload: &[u8]) -> Result<()>;
}

/// Connection-oriented byte-stream facility (web gateway side)
pub trait StreamTransport {
    /// Drain accepts, arrivals, send confirmations and closures into `out`
    fn poll(&mut self, out: &mut Vec<StreamEvent>) -> Result<()>;

    /// Queue bytes for transmission. Returns how many were accepted,
    /// bounded by the current send window; zero means the window is
    /// exhausted and the caller should retry after the next poll.
    fn enqueue(&mut self, conn: ConnId, data: &[u8]) -> Result<usize>;

    /// Bytes the send queue can accept right now
    fn send_window(&self, conn: ConnId) -> usize;

    /// Close a connection once the caller is done with it. Queued bytes
    /// are still flushed first.
    fn close(&mut self, conn: ConnId);
}
