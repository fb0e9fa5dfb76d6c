//! Process-wide mutable state shared by the core components
//!
//! Everything here is mutated from the single cooperative main loop, so the
//! struct is passed around as `&mut BagState` with no synchronization.

use crate::config::AppConfig;
use crate::motion::ShakeMonitor;
use crate::thermal::ThermalState;

/// Configured temperature targets for the two compartments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetTemps {
    pub heater: f32,
    pub freezer: f32,
}

/// Shared state read and written by every core component
pub struct BagState {
    /// Client-configurable temperature targets
    pub targets: TargetTemps,
    /// Calibration and shake-detection state machine (owns the sticky flag)
    pub shake: ShakeMonitor,
    /// Relay state and cooldown deadline
    pub thermal: ThermalState,
}

impl BagState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            targets: TargetTemps {
                heater: config.control.heater_target,
                freezer: config.control.freezer_target,
            },
            shake: ShakeMonitor::new(&config.motion),
            thermal: ThermalState::default(),
        }
    }
}
