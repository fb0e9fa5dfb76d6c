//! Response assembly and per-connection send tracking
//!
//! Every response closes the connection, but only after the transport has
//! confirmed every byte. `SendState` carries the enqueued/acknowledged
//! accounting that makes the close safe; closing before the final ack is
//! the bug class this design exists to rule out.

use crate::error::Result;
use crate::transport::{ConnId, StreamTransport};

/// Bodies at or under this size go out as a single enqueue
pub const SMALL_RESPONSE_MAX: usize = 2048;

/// Chunk size for larger bodies (one MSS worth)
pub const CHUNK_LEN: usize = 1460;

/// A fully assembled response: status line, headers, body
#[derive(Debug)]
pub struct Response {
    bytes: Vec<u8>,
}

impl Response {
    /// 200 with an HTML body
    pub fn html(body: &str) -> Self {
        Self::with_content_type("text/html; charset=UTF-8", body)
    }

    /// 200 with a JSON body
    pub fn json(body: &str) -> Self {
        Self::with_content_type("application/json", body)
    }

    fn with_content_type(content_type: &str, body: &str) -> Self {
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            content_type,
            body.len()
        );
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(body.as_bytes());
        Self { bytes }
    }

    /// 404 with the fixed plain-text body (no content length, the
    /// connection close delimits it)
    pub fn not_found() -> Self {
        Self {
            bytes: b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n404 - Not Found"
                .to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Transmission progress of one response on one connection
///
/// Created at first enqueue, dropped when the connection closes.
/// Invariant: acked <= enqueued <= total_length.
#[derive(Debug)]
pub struct SendState {
    bytes: Vec<u8>,
    total_length: usize,
    enqueued: usize,
    acked: usize,
}

impl SendState {
    pub fn new(response: Response) -> Self {
        let total_length = response.bytes.len();
        Self {
            bytes: response.bytes,
            total_length,
            enqueued: 0,
            acked: 0,
        }
    }

    /// Push as much of the remaining body as the send window takes.
    ///
    /// Small responses go out whole in one enqueue; larger ones are cut
    /// into chunks so a slow reader cannot pin a huge queue. Returns after
    /// the window is exhausted; call again once the transport confirms
    /// progress.
    pub fn pump(&mut self, conn: ConnId, transport: &mut dyn StreamTransport) -> Result<()> {
        while self.enqueued < self.total_length {
            let remaining = self.total_length - self.enqueued;
            let step = if self.total_length <= SMALL_RESPONSE_MAX {
                remaining
            } else {
                remaining.min(CHUNK_LEN)
            };
            let accepted = transport.enqueue(conn, &self.bytes[self.enqueued..self.enqueued + step])?;
            if accepted == 0 {
                break;
            }
            self.enqueued += accepted;
        }
        Ok(())
    }

    /// Record a send confirmation from the transport
    pub fn on_sent(&mut self, n: usize) {
        self.acked = (self.acked + n).min(self.enqueued);
    }

    /// True once every byte is enqueued and confirmed
    pub fn is_complete(&self) -> bool {
        self.enqueued >= self.total_length && self.acked >= self.total_length
    }

    pub fn total_length(&self) -> usize {
        self.total_length
    }
}
