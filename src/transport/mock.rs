//! In-memory transports with scriptable delivery and ack timing
//!
//! Used by the engine tests to drive the protocol handlers without
//! sockets. The stream mock keeps real window accounting: enqueued bytes
//! stay outstanding until the test acknowledges them, so the
//! close-only-after-full-ack behavior can be exercised honestly.

use super::{ConnId, Datagram, DatagramTransport, StreamEvent, StreamTransport};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Datagram mock: injected payloads come back from `poll`, broadcasts are
/// captured for inspection
#[derive(Default)]
pub struct MockDatagramTransport {
    pending: Vec<Datagram>,
    /// Everything the engine broadcast: (client port, payload)
    pub broadcasts: Vec<(u16, Vec<u8>)>,
}

impl MockDatagramTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, source: SocketAddr, payload: &[u8]) {
        self.pending.push(Datagram {
            source,
            payload: payload.to_vec(),
        });
    }
}

impl DatagramTransport for MockDatagramTransport {
    fn poll(&mut self, out: &mut Vec<Datagram>) -> Result<()> {
        out.append(&mut self.pending);
        Ok(())
    }

    fn send_broadcast(&mut self, port: u16, payload: &[u8]) -> Result<()> {
        self.broadcasts.push((port, payload.to_vec()));
        Ok(())
    }
}

struct MockConn {
    written: Vec<u8>,
    outstanding: usize,
    closed: bool,
}

/// Stream mock with explicit window accounting
pub struct MockStreamTransport {
    next_id: ConnId,
    queued: Vec<StreamEvent>,
    conns: HashMap<ConnId, MockConn>,
    capacity: usize,
    /// When true every enqueue is confirmed on the next poll; turn off to
    /// control ack timing from the test
    pub auto_ack: bool,
}

impl MockStreamTransport {
    pub fn new() -> Self {
        Self::with_capacity(8192)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_id: 1,
            queued: Vec::new(),
            conns: HashMap::new(),
            capacity,
            auto_ack: true,
        }
    }

    /// Simulate an incoming connection
    pub fn open(&mut self) -> ConnId {
        let id = self.next_id;
        self.next_id += 1;
        self.conns.insert(
            id,
            MockConn {
                written: Vec::new(),
                outstanding: 0,
                closed: false,
            },
        );
        self.queued.push(StreamEvent::Accepted(id));
        id
    }

    /// Simulate bytes arriving from the peer
    pub fn push_data(&mut self, conn: ConnId, payload: &[u8]) {
        self.queued.push(StreamEvent::Data(conn, payload.to_vec()));
    }

    /// Manually confirm `n` outstanding bytes (auto_ack = false mode)
    pub fn ack(&mut self, conn: ConnId, n: usize) {
        if let Some(c) = self.conns.get_mut(&conn) {
            c.outstanding = c.outstanding.saturating_sub(n);
        }
        self.queued.push(StreamEvent::Sent(conn, n));
    }

    /// Everything the engine has enqueued on `conn` so far
    pub fn written(&self, conn: ConnId) -> &[u8] {
        self.conns
            .get(&conn)
            .map(|c| c.written.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_closed(&self, conn: ConnId) -> bool {
        self.conns.get(&conn).map(|c| c.closed).unwrap_or(true)
    }

    /// Bytes enqueued but not yet acknowledged
    pub fn outstanding(&self, conn: ConnId) -> usize {
        self.conns.get(&conn).map(|c| c.outstanding).unwrap_or(0)
    }
}

impl Default for MockStreamTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTransport for MockStreamTransport {
    fn poll(&mut self, out: &mut Vec<StreamEvent>) -> Result<()> {
        out.append(&mut self.queued);
        Ok(())
    }

    fn enqueue(&mut self, conn: ConnId, data: &[u8]) -> Result<usize> {
        let auto_ack = self.auto_ack;
        let capacity = self.capacity;
        let c = self
            .conns
            .get_mut(&conn)
            .ok_or(Error::UnknownConnection(conn))?;
        if c.closed {
            return Err(Error::UnknownConnection(conn));
        }
        let room = capacity.saturating_sub(c.outstanding);
        let n = room.min(data.len());
        c.written.extend_from_slice(&data[..n]);
        c.outstanding += n;
        if auto_ack && n > 0 {
            c.outstanding -= n;
            self.queued.push(StreamEvent::Sent(conn, n));
        }
        Ok(n)
    }

    fn send_window(&self, conn: ConnId) -> usize {
        self.conns
            .get(&conn)
            .map(|c| self.capacity.saturating_sub(c.outstanding))
            .unwrap_or(0)
    }

    fn close(&mut self, conn: ConnId) {
        if let Some(c) = self.conns.get_mut(&conn) {
            c.closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_accounting() {
        let mut t = MockStreamTransport::with_capacity(100);
        t.auto_ack = false;
        let conn = t.open();

        assert_eq!(t.send_window(conn), 100);
        assert_eq!(t.enqueue(conn, &[0u8; 80]).unwrap(), 80);
        assert_eq!(t.send_window(conn), 20);

        // Window caps the accepted amount
        assert_eq!(t.enqueue(conn, &[0u8; 50]).unwrap(), 20);
        assert_eq!(t.send_window(conn), 0);
        assert_eq!(t.enqueue(conn, &[0u8; 10]).unwrap(), 0);

        t.ack(conn, 100);
        assert_eq!(t.send_window(conn), 100);
        assert_eq!(t.written(conn).len(), 100);
    }

    #[test]
    fn test_auto_ack_emits_sent_events() {
        let mut t = MockStreamTransport::new();
        let conn = t.open();
        t.enqueue(conn, b"hello").unwrap();

        let mut events = Vec::new();
        t.poll(&mut events).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, StreamEvent::Sent(c, 5) if *c == conn)));
    }
}
