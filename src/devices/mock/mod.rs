//! Simulated bag hardware for development and tests
//!
//! One shared core models the physical bag: two compartment temperatures
//! pulled around by the relay, a motion sensor at rest under gravity, and
//! an indicator LED. The driver handles all view the same core through
//! `Rc<RefCell<..>>`, which is fine because the engine is single-threaded
//! by construction.

mod noise;

pub use noise::NoiseGenerator;

use crate::devices::BagDevice;
use crate::drivers::thermo::celsius_to_raw;
use crate::drivers::{ImuDriver, ImuSample, Relay, StatusLed, TempChannel, TempSensor};
use crate::error::Result;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

/// Room temperature both compartments drift toward with the relay off
const AMBIENT_C: f32 = 22.0;

/// Asymptotic element temperatures with the relay on
const HEATER_LIMIT_C: f32 = 65.0;
const FREEZER_LIMIT_C: f32 = -12.0;

/// First-order pull rates (fraction per second)
const DRIVEN_RATE: f32 = 0.05;
const DRIFT_RATE: f32 = 0.01;

/// Accelerometer reading at rest: gravity on the Z axis
const GRAVITY_COUNTS: i16 = 16_384;

/// Sensor noise levels (raw counts / degrees)
const IMU_NOISE: f32 = 4.0;
const TEMP_NOISE_C: f32 = 0.05;

struct SimCore {
    noise: NoiseGenerator,
    heater_c: f32,
    freezer_c: f32,
    relay_on: bool,
    led_on: bool,
    shake_pending: bool,
    last_step: Instant,
}

impl SimCore {
    fn new(seed: u64) -> Self {
        Self {
            noise: NoiseGenerator::new(seed),
            heater_c: AMBIENT_C,
            freezer_c: AMBIENT_C,
            relay_on: false,
            led_on: false,
            shake_pending: false,
            last_step: Instant::now(),
        }
    }

    /// Advance the thermal model by however much wall time has passed
    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_step).as_secs_f32();
        self.last_step = now;
        if dt <= 0.0 {
            return;
        }

        if self.relay_on {
            let pull = (DRIVEN_RATE * dt).min(1.0);
            self.heater_c += (HEATER_LIMIT_C - self.heater_c) * pull;
            self.freezer_c += (FREEZER_LIMIT_C - self.freezer_c) * pull;
        } else {
            let pull = (DRIFT_RATE * dt).min(1.0);
            self.heater_c += (AMBIENT_C - self.heater_c) * pull;
            self.freezer_c += (AMBIENT_C - self.freezer_c) * pull;
        }
    }

    fn jitter(&mut self, base: i16) -> i16 {
        let value = base as f32 + self.noise.gaussian(IMU_NOISE);
        value.clamp(i16::MIN as f32, i16::MAX as f32).round() as i16
    }
}

/// Simulated bag; split into driver handles with [`MockBag::into_device`]
pub struct MockBag {
    core: Rc<RefCell<SimCore>>,
}

impl MockBag {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            core: Rc::new(RefCell::new(SimCore::new(seed))),
        }
    }

    /// Handle for poking the simulation from tests and demos
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            core: Rc::clone(&self.core),
        }
    }

    /// Split into the trait objects the engine consumes
    pub fn into_device(self) -> BagDevice {
        BagDevice {
            imu: Box::new(MockImu {
                core: Rc::clone(&self.core),
            }),
            thermo: Box::new(MockThermo {
                core: Rc::clone(&self.core),
            }),
            relay: Box::new(MockRelay {
                core: Rc::clone(&self.core),
            }),
            led: Box::new(MockLed { core: self.core }),
        }
    }
}

/// Test/demo control surface over the shared simulator core
#[derive(Clone)]
pub struct SimHandle {
    core: Rc<RefCell<SimCore>>,
}

impl SimHandle {
    /// Make the next motion sample a violent spike
    pub fn inject_shake(&self) {
        self.core.borrow_mut().shake_pending = true;
    }

    /// Pin the compartment temperatures
    pub fn set_temps(&self, heater_c: f32, freezer_c: f32) {
        let mut core = self.core.borrow_mut();
        core.heater_c = heater_c;
        core.freezer_c = freezer_c;
        core.last_step = Instant::now();
    }

    pub fn relay_on(&self) -> bool {
        self.core.borrow().relay_on
    }

    pub fn led_on(&self) -> bool {
        self.core.borrow().led_on
    }
}

struct MockImu {
    core: Rc<RefCell<SimCore>>,
}

impl ImuDriver for MockImu {
    fn read(&mut self) -> Result<ImuSample> {
        let mut core = self.core.borrow_mut();
        if core.shake_pending {
            core.shake_pending = false;
            return Ok(ImuSample {
                accel: [25_000, -20_000, GRAVITY_COUNTS],
                gyro: [12_000, -9_000, 3_000],
            });
        }
        Ok(ImuSample {
            accel: [core.jitter(0), core.jitter(0), core.jitter(GRAVITY_COUNTS)],
            gyro: [core.jitter(0), core.jitter(0), core.jitter(0)],
        })
    }
}

struct MockThermo {
    core: Rc<RefCell<SimCore>>,
}

impl TempSensor for MockThermo {
    fn read_raw(&mut self, channel: TempChannel) -> Result<u16> {
        let mut core = self.core.borrow_mut();
        core.advance();
        let celsius = match channel {
            TempChannel::Heater => core.heater_c,
            TempChannel::Freezer => core.freezer_c,
        };
        let noisy = celsius + core.noise.gaussian(TEMP_NOISE_C);
        Ok(celsius_to_raw(noisy))
    }
}

struct MockRelay {
    core: Rc<RefCell<SimCore>>,
}

impl Relay for MockRelay {
    fn set(&mut self, on: bool) -> Result<()> {
        let mut core = self.core.borrow_mut();
        core.advance();
        core.relay_on = on;
        log::debug!("mock: relay {}", if on { "on" } else { "off" });
        Ok(())
    }
}

struct MockLed {
    core: Rc<RefCell<SimCore>>,
}

impl StatusLed for MockLed {
    fn set(&mut self, on: bool) {
        self.core.borrow_mut().led_on = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::thermo::raw_to_celsius;

    #[test]
    fn test_rest_sample_is_calm() {
        let bag = MockBag::with_seed(42);
        let mut device = bag.into_device();
        let sample = device.imu.read().unwrap();
        assert!((sample.accel[2] as i32 - GRAVITY_COUNTS as i32).abs() < 100);
        assert!(sample.gyro.iter().all(|g| g.abs() < 100));
    }

    #[test]
    fn test_injected_shake_is_one_shot() {
        let bag = MockBag::with_seed(42);
        let handle = bag.handle();
        let mut device = bag.into_device();

        handle.inject_shake();
        let spike = device.imu.read().unwrap();
        assert!(spike.accel[0].abs() > 20_000);

        let calm = device.imu.read().unwrap();
        assert!(calm.accel[0].abs() < 100);
    }

    #[test]
    fn test_temps_read_near_set_point() {
        let bag = MockBag::with_seed(42);
        let handle = bag.handle();
        let mut device = bag.into_device();

        handle.set_temps(30.0, 5.0);
        let heater = raw_to_celsius(device.thermo.read_raw(TempChannel::Heater).unwrap());
        let freezer = raw_to_celsius(device.thermo.read_raw(TempChannel::Freezer).unwrap());
        assert!((heater - 30.0).abs() < 0.5, "heater={}", heater);
        assert!((freezer - 5.0).abs() < 0.5, "freezer={}", freezer);
    }

    #[test]
    fn test_relay_state_visible_through_handle() {
        let bag = MockBag::with_seed(42);
        let handle = bag.handle();
        let mut device = bag.into_device();

        assert!(!handle.relay_on());
        device.relay.set(true).unwrap();
        assert!(handle.relay_on());
        device.relay.set(false).unwrap();
        assert!(!handle.relay_on());
    }
}
