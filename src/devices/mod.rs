//! Device implementations behind the driver traits

pub mod mock;

use crate::config::AppConfig;
use crate::drivers::{ImuDriver, Relay, StatusLed, TempSensor};
use crate::error::{Error, Result};

/// The full driver set the engine runs against
pub struct BagDevice {
    pub imu: Box<dyn ImuDriver>,
    pub thermo: Box<dyn TempSensor>,
    pub relay: Box<dyn Relay>,
    pub led: Box<dyn StatusLed>,
}

/// Create the device driver set named by the configuration
pub fn create_device(config: &AppConfig) -> Result<BagDevice> {
    match config.device.device_type.as_str() {
        "mock" => Ok(mock::MockBag::with_seed(config.device.seed).into_device()),
        other => Err(Error::UnknownDevice(other.to_string())),
    }
}
