//! Transport implementation over non-blocking `std::net` sockets

use super::{ConnId, Datagram, DatagramTransport, StreamEvent, StreamTransport};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream, UdpSocket};

/// Receive buffer for one datagram (a lease request fits comfortably)
const DATAGRAM_BUF_LEN: usize = 1536;

/// Receive buffer for one stream read
const STREAM_BUF_LEN: usize = 1024;

/// Per-connection send queue capacity; doubles as the advertised window
const SEND_QUEUE_CAPACITY: usize = 8192;

/// UDP endpoint with broadcast enabled
pub struct UdpEndpoint {
    socket: UdpSocket,
}

impl UdpEndpoint {
    /// Bind to `addr`. Failure here is fatal for the owning service.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        socket.set_broadcast(true)?;
        log::info!("udp: bound to {}", addr);
        Ok(Self { socket })
    }
}

impl DatagramTransport for UdpEndpoint {
    fn poll(&mut self, out: &mut Vec<Datagram>) -> Result<()> {
        let mut buf = [0u8; DATAGRAM_BUF_LEN];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, source)) => out.push(Datagram {
                    source,
                    payload: buf[..len].to_vec(),
                }),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("udp: receive error: {}", e);
                    break;
                }
            }
        }
        Ok(())
    }

    fn send_broadcast(&mut self, port: u16, payload: &[u8]) -> Result<()> {
        self.socket
            .send_to(payload, (Ipv4Addr::BROADCAST, port))?;
        Ok(())
    }
}

struct NetConn {
    stream: TcpStream,
    /// Bytes accepted from the engine but not yet written to the kernel
    outbox: Vec<u8>,
    /// Engine asked for close; drop once the outbox drains
    closing: bool,
}

/// TCP endpoint: non-blocking listener plus per-connection send queues
pub struct TcpEndpoint {
    listener: TcpListener,
    conns: HashMap<ConnId, NetConn>,
    next_id: ConnId,
}

impl TcpEndpoint {
    /// Bind and listen on `addr`. Failure here is fatal for the owning
    /// service.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        log::info!("tcp: listening on {}", addr);
        Ok(Self {
            listener,
            conns: HashMap::new(),
            next_id: 1,
        })
    }

    fn accept_pending(&mut self, out: &mut Vec<StreamEvent>) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        log::warn!("tcp: failed to make {} non-blocking: {}", peer, e);
                        continue;
                    }
                    let id = self.next_id;
                    self.next_id += 1;
                    self.conns.insert(
                        id,
                        NetConn {
                            stream,
                            outbox: Vec::new(),
                            closing: false,
                        },
                    );
                    log::debug!("tcp: accepted {} as conn {}", peer, id);
                    out.push(StreamEvent::Accepted(id));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("tcp: accept error: {}", e);
                    break;
                }
            }
        }
    }
}

impl StreamTransport for TcpEndpoint {
    fn poll(&mut self, out: &mut Vec<StreamEvent>) -> Result<()> {
        self.accept_pending(out);

        let ids: Vec<ConnId> = self.conns.keys().copied().collect();
        for id in ids {
            let mut dead = false;
            let mut done = false;

            if let Some(conn) = self.conns.get_mut(&id) {
                // Drain arrivals
                let mut buf = [0u8; STREAM_BUF_LEN];
                loop {
                    match conn.stream.read(&mut buf) {
                        Ok(0) => {
                            dead = true;
                            break;
                        }
                        Ok(n) => out.push(StreamEvent::Data(id, buf[..n].to_vec())),
                        Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                        Err(e) => {
                            log::debug!("tcp: conn {} read error: {}", id, e);
                            dead = true;
                            break;
                        }
                    }
                }

                // Flush the send queue; written bytes count as confirmed
                while !dead && !conn.outbox.is_empty() {
                    match conn.stream.write(&conn.outbox) {
                        Ok(0) => break,
                        Ok(n) => {
                            conn.outbox.drain(..n);
                            out.push(StreamEvent::Sent(id, n));
                        }
                        Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                        Err(e) => {
                            log::debug!("tcp: conn {} write error: {}", id, e);
                            dead = true;
                            break;
                        }
                    }
                }

                if conn.closing && conn.outbox.is_empty() {
                    let _ = conn.stream.shutdown(Shutdown::Both);
                    done = true;
                }
            }

            if dead {
                self.conns.remove(&id);
                out.push(StreamEvent::Closed(id));
            } else if done {
                // Engine-initiated close, already forgotten upstream
                self.conns.remove(&id);
            }
        }
        Ok(())
    }

    fn enqueue(&mut self, conn: ConnId, data: &[u8]) -> Result<usize> {
        let c = self
            .conns
            .get_mut(&conn)
            .ok_or(Error::UnknownConnection(conn))?;
        let room = SEND_QUEUE_CAPACITY.saturating_sub(c.outbox.len());
        let n = room.min(data.len());
        c.outbox.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn send_window(&self, conn: ConnId) -> usize {
        self.conns
            .get(&conn)
            .map(|c| SEND_QUEUE_CAPACITY.saturating_sub(c.outbox.len()))
            .unwrap_or(0)
    }

    fn close(&mut self, conn: ConnId) {
        if let Some(c) = self.conns.get_mut(&conn) {
            c.closing = true;
        }
    }
}
