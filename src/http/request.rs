//! Request-line parsing over a bounded receive buffer
//!
//! One stream event is parsed in isolation. The interesting wrinkle is
//! that phone clients send POST bodies in a second TCP segment: a payload
//! that starts with `{` and carries the config key is that second
//! segment, not a new request, and must not produce another response.

/// Bytes of an arrival that are looked at; the rest is truncated away
pub const RECV_BUFFER_LEN: usize = 511;

/// Parsed request line plus the body fragment, borrowed from the buffer
#[derive(Debug, PartialEq)]
pub struct HttpRequest<'a> {
    pub method: &'a str,
    pub target: &'a str,
    /// Bytes after the blank line, when the segment carried any
    pub body: Option<&'a str>,
}

/// Classification of one inbound stream event
#[derive(Debug, PartialEq)]
pub enum Inbound<'a> {
    /// A parseable request line
    Request(HttpRequest<'a>),
    /// Trailing body segment of an already-answered POST
    ConfigFragment(&'a str),
    /// Malformed or unintelligible; consumed without a response
    Ignored,
}

/// Classify one arrival. `data` must already be truncated to
/// [`RECV_BUFFER_LEN`].
pub fn classify(data: &[u8]) -> Inbound<'_> {
    let text = match std::str::from_utf8(data) {
        Ok(t) => t,
        Err(_) => return Inbound::Ignored,
    };

    if text.starts_with('{') && text.contains("\"heater\"") {
        return Inbound::ConfigFragment(text);
    }

    let first_space = match text.find(' ') {
        Some(i) => i,
        None => return Inbound::Ignored,
    };
    let rest = &text[first_space + 1..];
    let second_space = match rest.find(' ') {
        Some(i) => i,
        None => return Inbound::Ignored,
    };

    let method = &text[..first_space];
    let target = &rest[..second_space];
    let body = text.split_once("\r\n\r\n").map(|(_, b)| b).filter(|b| !b.is_empty());

    Inbound::Request(HttpRequest {
        method,
        target,
        body,
    })
}
