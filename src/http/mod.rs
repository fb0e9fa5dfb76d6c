//! Web gateway: request routing and response transmission
//!
//! A thin HTTP/1.1 subset served straight off the stream transport: GET
//! and POST, exact-match routes, `Connection: close` on everything. Each
//! connection carries at most one response; its transmission is tracked by
//! [`SendState`] and the connection is closed only after full
//! acknowledgment.
//!
//! The reset endpoint does not reply inline. It restarts calibration and
//! parks the connection; the main loop's `tick` produces the reply once
//! the baseline is captured, so other clients keep being served during
//! the stillness window.

pub mod request;
pub mod response;

use crate::assets;
use crate::devices::BagDevice;
use crate::drivers::{TempChannel, TempSensor as _};
use crate::json;
use crate::state::BagState;
use crate::transport::{ConnId, StreamEvent, StreamTransport};
use request::{classify, HttpRequest, Inbound, RECV_BUFFER_LEN};
use response::{Response, SendState};
use std::collections::HashMap;
use std::time::Instant;

/// What a route decided to do with a request
enum Outcome {
    Respond(Response),
    /// Reply later, from `tick`, once calibration completes
    AwaitCalibration,
    NoResponse,
}

#[derive(Default)]
struct Connection {
    send: Option<SendState>,
    awaiting_reset: bool,
}

impl Connection {
    /// A connection that already produced output (or is parked) must not
    /// produce another response, whatever else arrives on it.
    fn busy(&self) -> bool {
        self.send.is_some() || self.awaiting_reset
    }
}

/// HTTP gateway over one stream transport
#[derive(Default)]
pub struct WebGateway {
    conns: HashMap<ConnId, Connection>,
}

impl WebGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport event through the gateway
    pub fn handle_event(
        &mut self,
        event: StreamEvent,
        transport: &mut dyn StreamTransport,
        state: &mut BagState,
        device: &mut BagDevice,
        now: Instant,
    ) {
        match event {
            StreamEvent::Accepted(id) => {
                self.conns.insert(id, Connection::default());
            }
            StreamEvent::Data(id, payload) => {
                self.handle_data(id, &payload, transport, state, device, now);
            }
            StreamEvent::Sent(id, n) => {
                if let Some(conn) = self.conns.get_mut(&id) {
                    if let Some(send) = conn.send.as_mut() {
                        send.on_sent(n);
                    }
                }
                self.service_conn(id, transport);
            }
            StreamEvent::Closed(id) => {
                self.conns.remove(&id);
            }
        }
    }

    /// Periodic housekeeping: release parked reset replies and keep
    /// partially sent responses moving as the window refills.
    pub fn tick(&mut self, transport: &mut dyn StreamTransport, state: &BagState) {
        if state.shake.is_calibrated() {
            let parked: Vec<ConnId> = self
                .conns
                .iter()
                .filter(|(_, c)| c.awaiting_reset)
                .map(|(id, _)| *id)
                .collect();
            for id in parked {
                if let Some(conn) = self.conns.get_mut(&id) {
                    conn.awaiting_reset = false;
                    conn.send = Some(SendState::new(Response::json(json::RESET_BODY)));
                }
                log::info!("http: calibration complete, releasing reset reply");
                self.service_conn(id, transport);
            }
        }

        let in_flight: Vec<ConnId> = self
            .conns
            .iter()
            .filter(|(_, c)| c.send.is_some())
            .map(|(id, _)| *id)
            .collect();
        for id in in_flight {
            self.service_conn(id, transport);
        }
    }

    /// Number of tracked connections (diagnostics)
    pub fn connection_count(&self) -> usize {
        self.conns.len()
    }

    fn handle_data(
        &mut self,
        id: ConnId,
        payload: &[u8],
        transport: &mut dyn StreamTransport,
        state: &mut BagState,
        device: &mut BagDevice,
        now: Instant,
    ) {
        // Bounded copy; anything past the buffer is silently truncated
        let data = &payload[..payload.len().min(RECV_BUFFER_LEN)];

        let outcome = match classify(data) {
            Inbound::ConfigFragment(fragment) => {
                // Second segment of an answered POST: apply, stay quiet
                apply_config_fields(state, fragment);
                Outcome::NoResponse
            }
            Inbound::Ignored => Outcome::NoResponse,
            Inbound::Request(req) => {
                if self.conns.get(&id).map(|c| c.busy()).unwrap_or(true) {
                    Outcome::NoResponse
                } else {
                    log::debug!("http: {} {}", req.method, req.target);
                    route(&req, state, device, now)
                }
            }
        };

        match outcome {
            Outcome::Respond(response) => {
                if let Some(conn) = self.conns.get_mut(&id) {
                    conn.send = Some(SendState::new(response));
                }
                self.service_conn(id, transport);
            }
            Outcome::AwaitCalibration => {
                if let Some(conn) = self.conns.get_mut(&id) {
                    conn.awaiting_reset = true;
                }
            }
            Outcome::NoResponse => {}
        }
    }

    /// Pump a connection's response; close it when done or broken
    fn service_conn(&mut self, id: ConnId, transport: &mut dyn StreamTransport) {
        let mut finished = false;
        let mut broken = false;

        if let Some(conn) = self.conns.get_mut(&id) {
            if let Some(send) = conn.send.as_mut() {
                match send.pump(id, transport) {
                    Ok(()) => finished = send.is_complete(),
                    Err(e) => {
                        log::debug!("http: conn {} send failed: {}", id, e);
                        broken = true;
                    }
                }
            }
        }

        if finished || broken {
            transport.close(id);
            self.conns.remove(&id);
        }
    }
}

/// Route one parsed request to its handler
fn route(
    req: &HttpRequest<'_>,
    state: &mut BagState,
    device: &mut BagDevice,
    now: Instant,
) -> Outcome {
    match (req.method, req.target) {
        ("GET", "/") | ("GET", "/index.html") => Outcome::Respond(Response::html(assets::INDEX_HTML)),

        ("GET", "/api/status") => {
            let heater = read_or_zero(device, TempChannel::Heater);
            let freezer = read_or_zero(device, TempChannel::Freezer);
            let shaken = state.shake.check(device.imu.as_mut());
            Outcome::Respond(Response::json(&json::status_body(heater, freezer, shaken)))
        }

        ("GET", "/api/config") => Outcome::Respond(Response::json(&json::config_body(
            state.targets.heater,
            state.targets.freezer,
        ))),

        ("POST", "/api/config") => {
            if let Some(body) = req.body {
                apply_config_fields(state, body);
            }
            // Always echo the (possibly unchanged) targets back
            Outcome::Respond(Response::json(&json::config_body(
                state.targets.heater,
                state.targets.freezer,
            )))
        }

        ("POST", "/api/reset") => {
            log::info!("http: reset requested, recalibrating");
            state.shake.reset(now);
            Outcome::AwaitCalibration
        }

        (_, target) => {
            log::debug!("http: no route for {} {}", req.method, target);
            Outcome::Respond(Response::not_found())
        }
    }
}

/// Apply whitelisted numeric fields from a config body
fn apply_config_fields(state: &mut BagState, body: &str) {
    if let Some(heater) = json::number_field(body, "heater") {
        log::info!("config: heater target {:.1} -> {:.1}", state.targets.heater, heater);
        state.targets.heater = heater;
    }
    if let Some(freezer) = json::number_field(body, "freezer") {
        log::info!(
            "config: freezer target {:.1} -> {:.1}",
            state.targets.freezer,
            freezer
        );
        state.targets.freezer = freezer;
    }
}

fn read_or_zero(device: &mut BagDevice, channel: TempChannel) -> f32 {
    match device.thermo.read_celsius(channel) {
        Ok(c) => c,
        Err(e) => {
            log::debug!("thermo: read failed on {:?}: {}", channel, e);
            0.0
        }
    }
}
