//! Lease responder: answers DISCOVER/REQUEST with OFFER/ACK
//!
//! A single-client access point needs just enough DHCP for a phone to
//! join, so this is not a general server. Addresses come from a cycling
//! counter over the host range; there is no hardware-address-to-lease
//! table. A REQUEST is acknowledged with whatever address was offered most
//! recently, whoever asks. That behavior is intentional and covered by
//! tests; do not "fix" it without revisiting the pairing flow.

pub mod wire;

use crate::transport::{Datagram, DatagramTransport};
use std::net::Ipv4Addr;
use wire::{LeaseRequest, MSG_ACK, MSG_DISCOVER, MSG_OFFER, MSG_REQUEST};

/// First assignable host octet
const POOL_FIRST_HOST: u8 = 2;

/// Last assignable host octet
const POOL_LAST_HOST: u8 = 254;

/// DHCP lease responder for the AP's /24
pub struct LeaseResponder {
    server_ip: Ipv4Addr,
    /// Host octet handed out by the next OFFER
    next_host: u8,
    /// Address carried by the most recent OFFER; every ACK echoes it
    last_offered: Option<Ipv4Addr>,
}

impl LeaseResponder {
    pub fn new(server_ip: Ipv4Addr) -> Self {
        Self {
            server_ip,
            next_host: POOL_FIRST_HOST,
            last_offered: None,
        }
    }

    /// Handle one datagram; returns the reply frame to broadcast, if any
    pub fn handle_datagram(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        let request = match LeaseRequest::parse(payload) {
            Some(r) => r,
            None => {
                log::debug!("dhcp: dropped short datagram ({} bytes)", payload.len());
                return None;
            }
        };

        let message_type = request.message_type()?;
        let reply_type = match message_type {
            MSG_DISCOVER => MSG_OFFER,
            MSG_REQUEST => MSG_ACK,
            other => {
                log::debug!("dhcp: ignoring message type {}", other);
                return None;
            }
        };

        let yiaddr = if message_type == MSG_DISCOVER {
            let offered = self.advance_pool();
            self.last_offered = Some(offered);
            log::info!(
                "dhcp: OFFER {} to {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                offered,
                request.chaddr[0],
                request.chaddr[1],
                request.chaddr[2],
                request.chaddr[3],
                request.chaddr[4],
                request.chaddr[5]
            );
            offered
        } else {
            // ACK the last offer without re-validating the requester
            let confirmed = self.last_offered.unwrap_or(Ipv4Addr::UNSPECIFIED);
            log::info!("dhcp: ACK {}", confirmed);
            confirmed
        };

        Some(wire::build_reply(&request, reply_type, yiaddr, self.server_ip))
    }

    /// Poll the transport and answer everything that arrived
    pub fn service(&mut self, transport: &mut dyn DatagramTransport, scratch: &mut Vec<Datagram>) {
        scratch.clear();
        if let Err(e) = transport.poll(scratch) {
            log::warn!("dhcp: poll failed: {}", e);
            return;
        }
        for datagram in scratch.drain(..) {
            if let Some(reply) = self.handle_datagram(&datagram.payload) {
                if let Err(e) = transport.send_broadcast(wire::CLIENT_PORT, &reply) {
                    log::warn!("dhcp: failed to send reply: {}", e);
                }
            }
        }
    }

    fn advance_pool(&mut self) -> Ipv4Addr {
        let host = self.next_host;
        self.next_host = if self.next_host >= POOL_LAST_HOST {
            POOL_FIRST_HOST
        } else {
            self.next_host + 1
        };
        let base = self.server_ip.octets();
        Ipv4Addr::new(base[0], base[1], base[2], host)
    }
}
