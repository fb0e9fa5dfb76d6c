//! End-to-end scenario: a phone joins the access point and operates the
//! bag through the public engine API, everything over mock transports and
//! the simulated device.

use ibag_io::config::AppConfig;
use ibag_io::devices::mock::MockBag;
use ibag_io::devices::BagDevice;
use ibag_io::dhcp::{wire, LeaseResponder};
use ibag_io::drivers::{Relay as _, TempSensor as _};
use ibag_io::http::WebGateway;
use ibag_io::state::BagState;
use ibag_io::thermal::ThermalController;
use ibag_io::transport::{
    ConnId, MockDatagramTransport, MockStreamTransport, StreamTransport,
};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// Well-formed lease request frame of the given message type
fn lease_frame(message_type: u8, xid: u32, mac: [u8; 6]) -> Vec<u8> {
    let mut frame = vec![0u8; wire::MIN_PACKET_LEN + 8];
    frame[0] = 1; // BOOTREQUEST
    frame[1] = 1; // Ethernet
    frame[2] = 6;
    frame[4..8].copy_from_slice(&xid.to_be_bytes());
    frame[28..34].copy_from_slice(&mac);
    frame[236..240].copy_from_slice(&wire::MAGIC_COOKIE);
    frame[240] = wire::OPT_MESSAGE_TYPE;
    frame[241] = 1;
    frame[242] = message_type;
    frame[243] = wire::OPT_END;
    frame
}

fn yiaddr_of(reply: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(reply[16], reply[17], reply[18], reply[19])
}

struct Engine {
    gateway: WebGateway,
    web: MockStreamTransport,
    state: BagState,
    device: BagDevice,
    sim: ibag_io::devices::mock::SimHandle,
}

impl Engine {
    fn new() -> Self {
        let config = AppConfig::default();
        let bag = MockBag::with_seed(7);
        let sim = bag.handle();
        Self {
            gateway: WebGateway::new(),
            web: MockStreamTransport::new(),
            state: BagState::new(&config),
            device: bag.into_device(),
            sim,
        }
    }

    fn pump(&mut self, now: Instant) {
        let mut events = Vec::new();
        for _ in 0..10 {
            events.clear();
            self.web.poll(&mut events).unwrap();
            if events.is_empty() {
                break;
            }
            for event in events.drain(..) {
                self.gateway.handle_event(
                    event,
                    &mut self.web,
                    &mut self.state,
                    &mut self.device,
                    now,
                );
            }
        }
        self.gateway.tick(&mut self.web, &self.state);
    }

    fn http(&mut self, raw: &[u8], now: Instant) -> (ConnId, String) {
        let conn = self.web.open();
        self.web.push_data(conn, raw);
        self.pump(now);
        let text = String::from_utf8_lossy(self.web.written(conn)).into_owned();
        (conn, text)
    }

    fn body(response: &str) -> &str {
        response.split("\r\n\r\n").nth(1).unwrap_or("")
    }
}

#[test]
fn test_phone_session() {
    let t0 = Instant::now();
    let mut engine = Engine::new();

    // ---- Join the AP: DISCOVER -> OFFER, REQUEST -> ACK ----
    let mut responder = LeaseResponder::new(Ipv4Addr::new(192, 168, 4, 1));
    let mut udp = MockDatagramTransport::new();
    let phone = "0.0.0.0:68".parse().unwrap();
    let mac = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

    udp.inject(phone, &lease_frame(wire::MSG_DISCOVER, 0x1001, mac));
    udp.inject(phone, &lease_frame(wire::MSG_REQUEST, 0x1002, mac));
    let mut scratch = Vec::new();
    responder.service(&mut udp, &mut scratch);

    assert_eq!(udp.broadcasts.len(), 2);
    let offered = yiaddr_of(&udp.broadcasts[0].1);
    assert_eq!(offered, Ipv4Addr::new(192, 168, 4, 2));
    assert_eq!(yiaddr_of(&udp.broadcasts[1].1), offered);
    assert_eq!(udp.broadcasts[0].0, wire::CLIENT_PORT);

    // ---- Boot calibration completes after the stillness window ----
    engine.state.shake.reset(t0);
    engine
        .state
        .shake
        .update(engine.device.imu.as_mut(), t0 + Duration::from_secs(10));
    assert!(engine.state.shake.is_calibrated());

    // ---- Load the dashboard ----
    let now = t0 + Duration::from_secs(11);
    let (_, page) = engine.http(b"GET / HTTP/1.1\r\nHost: 192.168.4.1\r\n\r\n", now);
    assert!(page.starts_with("HTTP/1.1 200 OK"));
    assert!(page.contains("Content-Type: text/html"));

    // ---- Calm bag: status reports shaken false ----
    let (_, status) = engine.http(b"GET /api/status HTTP/1.1\r\n\r\n", now);
    assert!(Engine::body(&status).ends_with("\"shaken\":false}"));

    // ---- Configure targets; the reply echoes them back ----
    let (_, config) = engine.http(
        b"POST /api/config HTTP/1.1\r\n\r\n{\"heater\":30.0,\"freezer\":10.0}",
        now,
    );
    assert_eq!(
        Engine::body(&config),
        "{\"status\":\"ok\",\"heater\":30.0,\"freezer\":10.0}"
    );

    // ---- Rough handling latches the alarm, stickily ----
    engine.sim.inject_shake();
    let (_, shaken) = engine.http(b"GET /api/status HTTP/1.1\r\n\r\n", now);
    assert!(Engine::body(&shaken).ends_with("\"shaken\":true}"));
    let (_, still_shaken) = engine.http(b"GET /api/status HTTP/1.1\r\n\r\n", now);
    assert!(Engine::body(&still_shaken).ends_with("\"shaken\":true}"));

    // ---- Reset parks the reply until recalibration finishes ----
    let reset_conn = engine.web.open();
    engine
        .web
        .push_data(reset_conn, b"POST /api/reset HTTP/1.1\r\n\r\n");
    engine.pump(now);
    assert!(engine.web.written(reset_conn).is_empty());
    assert!(!engine.state.shake.is_shaken());

    let later = now + Duration::from_secs(10);
    engine
        .state
        .shake
        .update(engine.device.imu.as_mut(), later);
    engine.pump(later);
    let reset_reply = String::from_utf8_lossy(engine.web.written(reset_conn)).into_owned();
    assert_eq!(Engine::body(&reset_reply), "{\"status\":\"ok\"}");

    // ---- Fresh calibration: the alarm is armed again, not latched ----
    let (_, calm) = engine.http(b"GET /api/status HTTP/1.1\r\n\r\n", later);
    assert!(Engine::body(&calm).ends_with("\"shaken\":false}"));
}

#[test]
fn test_regulation_cycle() {
    let t0 = Instant::now();
    let config = AppConfig::default();
    let bag = MockBag::with_seed(7);
    let sim = bag.handle();
    let mut device = bag.into_device();
    let mut state = BagState::new(&config);
    let controller = ThermalController::new(&config.thermal);

    // Sentinel targets keep the relay off whatever the probes say
    sim.set_temps(40.0, -5.0);
    for k in 0..5u64 {
        let now = t0 + Duration::from_secs(k);
        let heater = device
            .thermo
            .read_celsius(ibag_io::drivers::TempChannel::Heater)
            .unwrap();
        let freezer = device
            .thermo
            .read_celsius(ibag_io::drivers::TempChannel::Freezer)
            .unwrap();
        assert_eq!(
            controller.tick(&mut state.thermal, &state.targets, heater, freezer, now),
            None
        );
    }
    assert!(!state.thermal.relay_on);

    // Real targets, both channels diverged: exactly one turn-on
    state.targets.heater = 30.0;
    state.targets.freezer = 5.0;
    sim.set_temps(20.0, 20.0);

    let mut commands = Vec::new();
    for k in 5..8u64 {
        let now = t0 + Duration::from_secs(k);
        if let Some(cmd) = controller.tick(&mut state.thermal, &state.targets, 20.0, 20.0, now) {
            device.relay.set(cmd).unwrap();
            commands.push(cmd);
        }
    }
    assert_eq!(commands, vec![true]);
    assert!(sim.relay_on());

    // Heater reaches its band: off, and cooldown holds even though the
    // readings diverge again right away
    let hit = t0 + Duration::from_secs(9);
    assert_eq!(
        controller.tick(&mut state.thermal, &state.targets, 29.8, 20.0, hit),
        Some(false)
    );
    for k in 10..40u64 {
        let now = t0 + Duration::from_secs(k);
        assert_eq!(
            controller.tick(&mut state.thermal, &state.targets, 20.0, 20.0, now),
            None
        );
    }
    assert!(!state.thermal.relay_on);

    // Past the dwell the relay may engage again
    let after = hit + Duration::from_secs(61);
    controller.tick(&mut state.thermal, &state.targets, 20.0, 20.0, after);
    assert_eq!(
        controller.tick(&mut state.thermal, &state.targets, 20.0, 20.0, after),
        Some(true)
    );
}
