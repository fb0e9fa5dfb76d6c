//! Application orchestration: service bring-up and the cooperative loop
//!
//! Everything runs on one thread. Each loop iteration polls both
//! transports, dispatches whatever arrived, advances calibration, then
//! runs the slower periodic jobs on their own cadences: the background
//! shake check, the thermal controller, the heartbeat log and the
//! indicator LED. A service that fails to bind at startup is logged and
//! left out; the rest of the engine keeps running.

use crate::config::AppConfig;
use crate::devices::{create_device, BagDevice};
use crate::dhcp::{wire, LeaseResponder};
use crate::drivers::{Relay as _, StatusLed as _, TempChannel, TempSensor as _};
use crate::error::Result;
use crate::http::WebGateway;
use crate::state::BagState;
use crate::thermal::ThermalController;
use crate::transport::{Datagram, StreamEvent, StreamTransport, TcpEndpoint, UdpEndpoint};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Background shake sampling cadence
const SHAKE_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Thermal control cadence
const THERMAL_INTERVAL: Duration = Duration::from_secs(1);

/// Heartbeat log cadence
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Indicator LED toggle cadence
const LED_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep between loop iterations
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Deadlines for the periodic jobs
struct Cadence {
    shake_check: Instant,
    thermal: Instant,
    heartbeat: Instant,
    led: Instant,
}

impl Cadence {
    fn new(now: Instant) -> Self {
        Self {
            shake_check: now,
            thermal: now,
            heartbeat: now,
            led: now,
        }
    }
}

/// The assembled engine
pub struct BagApp {
    state: BagState,
    device: BagDevice,
    controller: ThermalController,
    dhcp: Option<(LeaseResponder, UdpEndpoint)>,
    web: Option<(WebGateway, TcpEndpoint)>,
    shutdown: Arc<AtomicBool>,
    cadence: Cadence,
    led_on: bool,
    datagram_scratch: Vec<Datagram>,
    event_scratch: Vec<StreamEvent>,
}

impl BagApp {
    /// Build the engine: device drivers, shared state, and both network
    /// services. Bind failures disable the affected service only.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let device = create_device(config)?;
        let mut state = BagState::new(config);
        let controller = ThermalController::new(&config.thermal);
        let now = Instant::now();

        // The bag calibrates its rest position at boot
        state.shake.reset(now);

        let dhcp = if config.network.dhcp_enabled {
            let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, wire::SERVER_PORT));
            match UdpEndpoint::bind(addr) {
                Ok(endpoint) => {
                    log::info!(
                        "dhcp: serving {}.2-{}.254",
                        net_prefix(config.network.ap_address),
                        net_prefix(config.network.ap_address)
                    );
                    Some((LeaseResponder::new(config.network.ap_address), endpoint))
                }
                Err(e) => {
                    log::error!("dhcp: bind failed, lease responder disabled: {}", e);
                    None
                }
            }
        } else {
            log::info!("dhcp: disabled by configuration");
            None
        };

        let web = {
            let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.network.http_port));
            match TcpEndpoint::bind(addr) {
                Ok(endpoint) => Some((WebGateway::new(), endpoint)),
                Err(e) => {
                    log::error!("http: bind failed, web gateway disabled: {}", e);
                    None
                }
            }
        };

        Ok(Self {
            state,
            device,
            controller,
            dhcp,
            web,
            shutdown: Arc::new(AtomicBool::new(false)),
            cadence: Cadence::new(now),
            led_on: false,
            datagram_scratch: Vec::new(),
            event_scratch: Vec::new(),
        })
    }

    /// Flag the main loop watches; hand it to the signal handler
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run until the shutdown flag is raised
    pub fn run(&mut self) -> Result<()> {
        log::info!(
            "iBag engine running (dhcp: {}, http: {})",
            if self.dhcp.is_some() { "up" } else { "down" },
            if self.web.is_some() { "up" } else { "down" }
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            self.poll_once(Instant::now());
            std::thread::sleep(IDLE_SLEEP);
        }

        // Release the relay on the way out
        if self.state.thermal.relay_on {
            if let Err(e) = self.device.relay.set(false) {
                log::warn!("thermal: relay release failed: {}", e);
            }
        }
        log::info!("iBag engine stopped");
        Ok(())
    }

    /// One cooperative loop iteration
    fn poll_once(&mut self, now: Instant) {
        // Lease responder
        if let Some((responder, transport)) = self.dhcp.as_mut() {
            responder.service(transport, &mut self.datagram_scratch);
        }

        // Web gateway
        if let Some((gateway, transport)) = self.web.as_mut() {
            self.event_scratch.clear();
            if let Err(e) = transport.poll(&mut self.event_scratch) {
                log::warn!("http: poll failed: {}", e);
            }
            for event in self.event_scratch.drain(..) {
                gateway.handle_event(event, transport, &mut self.state, &mut self.device, now);
            }
            gateway.tick(transport, &self.state);
        }

        // Calibration progress
        self.state.shake.update(self.device.imu.as_mut(), now);

        // Background shake sampling
        if now.duration_since(self.cadence.shake_check) >= SHAKE_CHECK_INTERVAL {
            self.cadence.shake_check = now;
            self.state.shake.check(self.device.imu.as_mut());
        }

        // Thermal regulation
        if now.duration_since(self.cadence.thermal) >= THERMAL_INTERVAL {
            self.cadence.thermal = now;
            self.thermal_tick(now);
        }

        // Indicator LED
        if now.duration_since(self.cadence.led) >= LED_INTERVAL {
            self.cadence.led = now;
            self.led_on = !self.led_on;
            self.device.led.set(self.led_on);
        }

        // Heartbeat
        if now.duration_since(self.cadence.heartbeat) >= HEARTBEAT_INTERVAL {
            self.cadence.heartbeat = now;
            log::info!(
                "status: shaken={} relay={} targets=({:.1},{:.1}) connections={}",
                self.state.shake.is_shaken(),
                self.state.thermal.relay_on,
                self.state.targets.heater,
                self.state.targets.freezer,
                self.web
                    .as_ref()
                    .map(|(g, _)| g.connection_count())
                    .unwrap_or(0)
            );
        }
    }

    /// Read both channels and run one control step; a failed read skips
    /// the step entirely
    fn thermal_tick(&mut self, now: Instant) {
        let heater = match self.device.thermo.read_celsius(TempChannel::Heater) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("thermal: heater read failed: {}", e);
                return;
            }
        };
        let freezer = match self.device.thermo.read_celsius(TempChannel::Freezer) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("thermal: freezer read failed: {}", e);
                return;
            }
        };

        if let Some(command) =
            self.controller
                .tick(&mut self.state.thermal, &self.state.targets, heater, freezer, now)
        {
            if let Err(e) = self.device.relay.set(command) {
                log::warn!("thermal: relay switch failed: {}", e);
            }
        }
    }
}

fn net_prefix(addr: Ipv4Addr) -> String {
    let o = addr.octets();
    format!("{}.{}.{}", o[0], o[1], o[2])
}
