//! Configuration for the iBag daemon
//!
//! Loads configuration from a TOML file. Every section has shipped defaults
//! so the daemon can run without a file at all (the device image does not
//! always carry one).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub thermal: ThermalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device selection (which driver set backs the sensor/actuator traits)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Driver set to instantiate ("mock" is the only in-tree implementation)
    pub device_type: String,
    /// Noise seed for the mock device (0 = random entropy)
    pub seed: u64,
}

/// Access-point network identity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Address the AP interface carries; also server id, router and DNS in
    /// lease replies
    pub ap_address: Ipv4Addr,
    /// HTTP listening port
    pub http_port: u16,
    /// Whether the lease responder is started
    pub dhcp_enabled: bool,
}

/// Temperature regulation targets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    /// Heater compartment target (Celsius)
    pub heater_target: f32,
    /// Freezer compartment target (Celsius)
    pub freezer_target: f32,
}

/// Motion sensing thresholds and calibration window
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotionConfig {
    /// L1 acceleration distance that counts as a shake (raw sensor units)
    pub accel_threshold: i32,
    /// L1 angular-rate distance that counts as a shake (raw sensor units)
    pub gyro_threshold: i32,
    /// How long the device must sit still before the baseline is captured
    pub calibration_secs: u64,
}

/// Thermal controller tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThermalConfig {
    /// Half-width of the band around a target that counts as "reached"
    pub band: f32,
    /// Mandatory relay-off dwell after a target hit
    pub cooldown_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: "mock".to_string(),
            seed: 0,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ap_address: Ipv4Addr::new(192, 168, 4, 1),
            http_port: 8000,
            dhcp_enabled: true,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        // The shipped pair doubles as the "regulation off" sentinel; the
        // relay stays idle until a client configures real targets.
        Self {
            heater_target: 25.0,
            freezer_target: 24.0,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            accel_threshold: 20_000,
            gyro_threshold: 15_000,
            calibration_secs: 10,
        }
    }
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            band: 0.5,
            cooldown_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl MotionConfig {
    pub fn calibration_window(&self) -> Duration {
        Duration::from_secs(self.calibration_secs)
    }
}

impl ThermalConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
