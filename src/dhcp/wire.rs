//! DHCP frame layout: parsing and reply assembly
//!
//! Fixed BOOTP header (236 bytes), magic cookie at offset 236, then a
//! tag/length/value option area of up to 308 bytes terminated by tag 255.
//! Validation is deliberately minimal: anything at least the minimum
//! length is parsed, everything else about the frame is taken at face
//! value. Option walking is bounds-checked; a malformed option area simply
//! ends the iteration.

use std::net::Ipv4Addr;

/// Server listening port
pub const SERVER_PORT: u16 = 67;

/// Client port replies are broadcast to
pub const CLIENT_PORT: u16 = 68;

/// Minimum parseable payload: fixed header plus cookie
pub const MIN_PACKET_LEN: usize = 240;

/// Option area starts right after the cookie
const OPTIONS_OFFSET: usize = 240;

/// Option area size
const OPTIONS_LEN: usize = 308;

/// Full frame size used for replies (header + cookie + option area)
pub const REPLY_LEN: usize = OPTIONS_OFFSET + OPTIONS_LEN;

/// Magic cookie, network byte order
pub const MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Lease duration carried in every reply (seconds)
pub const LEASE_TIME_SECS: u32 = 3600;

/// /24 subnet mask carried in every reply
const SUBNET_MASK: [u8; 4] = [255, 255, 255, 0];

// Option tags
pub const OPT_SUBNET_MASK: u8 = 1;
pub const OPT_ROUTER: u8 = 3;
pub const OPT_DNS: u8 = 6;
pub const OPT_LEASE_TIME: u8 = 51;
pub const OPT_MESSAGE_TYPE: u8 = 53;
pub const OPT_SERVER_ID: u8 = 54;
pub const OPT_PAD: u8 = 0;
pub const OPT_END: u8 = 255;

// Message types
pub const MSG_DISCOVER: u8 = 1;
pub const MSG_OFFER: u8 = 2;
pub const MSG_REQUEST: u8 = 3;
pub const MSG_ACK: u8 = 5;

/// Parsed view of an incoming request frame
#[derive(Debug)]
pub struct LeaseRequest<'a> {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub xid: [u8; 4],
    /// Full 16-byte hardware address field; first 6 bytes meaningful for
    /// Ethernet
    pub chaddr: [u8; 16],
    options: &'a [u8],
}

impl<'a> LeaseRequest<'a> {
    /// Parse a datagram payload. Payloads below the minimum length are
    /// rejected with `None`; the caller drops them silently.
    pub fn parse(payload: &'a [u8]) -> Option<Self> {
        if payload.len() < MIN_PACKET_LEN {
            return None;
        }

        let mut xid = [0u8; 4];
        xid.copy_from_slice(&payload[4..8]);
        let mut chaddr = [0u8; 16];
        chaddr.copy_from_slice(&payload[28..44]);

        Some(Self {
            op: payload[0],
            htype: payload[1],
            hlen: payload[2],
            xid,
            chaddr,
            options: &payload[OPTIONS_OFFSET..],
        })
    }

    /// Walk the option area
    pub fn options(&self) -> OptionsIter<'a> {
        OptionsIter {
            data: self.options,
            pos: 0,
        }
    }

    /// Value of the message-type option, if present and well formed
    pub fn message_type(&self) -> Option<u8> {
        self.options()
            .find(|(tag, _)| *tag == OPT_MESSAGE_TYPE)
            .and_then(|(_, value)| value.first().copied())
    }
}

/// Bounds-checked tag/length/value iterator over a DHCP option area
pub struct OptionsIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for OptionsIter<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tag = *self.data.get(self.pos)?;
            if tag == OPT_END {
                return None;
            }
            if tag == OPT_PAD {
                self.pos += 1;
                continue;
            }
            let len = *self.data.get(self.pos + 1)? as usize;
            let start = self.pos + 2;
            let end = start + len;
            if end > self.data.len() {
                // Truncated option, stop walking
                return None;
            }
            self.pos = end;
            return Some((tag, &self.data[start..end]));
        }
    }
}

/// Build an OFFER or ACK frame mirroring `request`.
///
/// `server` is used for the server identifier, router and DNS options and
/// the siaddr field; `yiaddr` is the address being handed out. The option
/// set and its order are fixed.
pub fn build_reply(
    request: &LeaseRequest<'_>,
    message_type: u8,
    yiaddr: Ipv4Addr,
    server: Ipv4Addr,
) -> Vec<u8> {
    let mut frame = vec![0u8; REPLY_LEN];

    frame[0] = 2; // BOOTREPLY
    frame[1] = request.htype;
    frame[2] = request.hlen;
    frame[4..8].copy_from_slice(&request.xid);
    frame[16..20].copy_from_slice(&yiaddr.octets());
    frame[20..24].copy_from_slice(&server.octets());
    frame[28..44].copy_from_slice(&request.chaddr);
    frame[236..240].copy_from_slice(&MAGIC_COOKIE);

    let mut at = OPTIONS_OFFSET;
    let mut put = |frame: &mut Vec<u8>, tag: u8, value: &[u8]| {
        frame[at] = tag;
        frame[at + 1] = value.len() as u8;
        frame[at + 2..at + 2 + value.len()].copy_from_slice(value);
        at += 2 + value.len();
    };

    put(&mut frame, OPT_MESSAGE_TYPE, &[message_type]);
    put(&mut frame, OPT_SERVER_ID, &server.octets());
    put(&mut frame, OPT_LEASE_TIME, &LEASE_TIME_SECS.to_be_bytes());
    put(&mut frame, OPT_SUBNET_MASK, &SUBNET_MASK);
    put(&mut frame, OPT_ROUTER, &server.octets());
    put(&mut frame, OPT_DNS, &server.octets());
    frame[at] = OPT_END;

    frame
}

/// Minimal well-formed request frame, shared by the protocol tests
#[cfg(test)]
pub(crate) fn request_frame(message_type: u8, xid: u32, mac: [u8; 6]) -> Vec<u8> {
    let mut frame = vec![0u8; MIN_PACKET_LEN + 16];
    frame[0] = 1; // BOOTREQUEST
    frame[1] = 1; // Ethernet
    frame[2] = 6;
    frame[4..8].copy_from_slice(&xid.to_be_bytes());
    frame[28..34].copy_from_slice(&mac);
    frame[236..240].copy_from_slice(&MAGIC_COOKIE);
    frame[240] = OPT_MESSAGE_TYPE;
    frame[241] = 1;
    frame[242] = message_type;
    frame[243] = OPT_END;
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_payload_rejected() {
        assert!(LeaseRequest::parse(&[0u8; 239]).is_none());
        assert!(LeaseRequest::parse(&[]).is_none());
        assert!(LeaseRequest::parse(&[0u8; 240]).is_some());
    }

    #[test]
    fn test_parse_header_fields() {
        let frame = request_frame(MSG_DISCOVER, 0xDEADBEEF, [2, 4, 6, 8, 10, 12]);
        let req = LeaseRequest::parse(&frame).unwrap();
        assert_eq!(req.op, 1);
        assert_eq!(req.htype, 1);
        assert_eq!(req.hlen, 6);
        assert_eq!(req.xid, 0xDEADBEEFu32.to_be_bytes());
        assert_eq!(&req.chaddr[..6], &[2, 4, 6, 8, 10, 12]);
        assert_eq!(req.message_type(), Some(MSG_DISCOVER));
    }

    #[test]
    fn test_options_iter_skips_pad_and_stops_at_end() {
        let mut frame = vec![0u8; MIN_PACKET_LEN + 12];
        frame[240] = OPT_PAD;
        frame[241] = OPT_PAD;
        frame[242] = OPT_MESSAGE_TYPE;
        frame[243] = 1;
        frame[244] = MSG_REQUEST;
        frame[245] = OPT_END;
        frame[246] = OPT_MESSAGE_TYPE; // past the end tag, must not be seen
        frame[247] = 1;
        frame[248] = MSG_DISCOVER;

        let req = LeaseRequest::parse(&frame).unwrap();
        let opts: Vec<_> = req.options().collect();
        assert_eq!(opts.len(), 1);
        assert_eq!(opts[0], (OPT_MESSAGE_TYPE, &[MSG_REQUEST][..]));
    }

    #[test]
    fn test_options_iter_truncated_option() {
        let mut frame = vec![0u8; MIN_PACKET_LEN + 2];
        frame[240] = OPT_MESSAGE_TYPE;
        frame[241] = 60; // claims more bytes than the frame has
        let req = LeaseRequest::parse(&frame).unwrap();
        assert_eq!(req.options().count(), 0);
        assert_eq!(req.message_type(), None);
    }

    #[test]
    fn test_reply_layout() {
        let frame = request_frame(MSG_DISCOVER, 0x01020304, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let req = LeaseRequest::parse(&frame).unwrap();
        let server = Ipv4Addr::new(192, 168, 4, 1);
        let yiaddr = Ipv4Addr::new(192, 168, 4, 7);

        let reply = build_reply(&req, MSG_OFFER, yiaddr, server);
        assert_eq!(reply.len(), REPLY_LEN);
        assert_eq!(reply[0], 2); // BOOTREPLY
        assert_eq!(reply[1], 1);
        assert_eq!(reply[2], 6);
        assert_eq!(&reply[4..8], &0x01020304u32.to_be_bytes());
        assert_eq!(&reply[16..20], &[192, 168, 4, 7]);
        assert_eq!(&reply[20..24], &[192, 168, 4, 1]);
        assert_eq!(&reply[28..34], &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(&reply[236..240], &MAGIC_COOKIE);

        // Fixed option order: type, server id, lease, mask, router, dns
        let parsed = LeaseRequest::parse(&reply).unwrap();
        let opts: Vec<_> = parsed.options().collect();
        assert_eq!(
            opts.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
            vec![
                OPT_MESSAGE_TYPE,
                OPT_SERVER_ID,
                OPT_LEASE_TIME,
                OPT_SUBNET_MASK,
                OPT_ROUTER,
                OPT_DNS
            ]
        );
        assert_eq!(opts[0].1, &[MSG_OFFER]);
        assert_eq!(opts[2].1, &LEASE_TIME_SECS.to_be_bytes());
        assert_eq!(opts[3].1, &[255, 255, 255, 0]);
    }
}
