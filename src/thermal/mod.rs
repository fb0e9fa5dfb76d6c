//! Bang-bang thermal regulation with a mandatory off-dwell
//!
//! The bag has one relay that drives both the heating and the cooling
//! elements. Control is deliberately coarse: turn on while either
//! compartment is outside its target band, turn off the moment either one
//! reaches its band, then hold off for a fixed cooldown before the relay
//! may energize again. The 0.5 degree band half-width and the dwell time
//! are load-bearing constants; there is no finer control law.

use crate::config::ThermalConfig;
use crate::state::TargetTemps;
use std::time::{Duration, Instant};

/// Target pair that means "regulation disabled". The relay is forced off
/// until a client configures anything else.
pub const DISABLED_HEATER_TARGET: f32 = 25.0;
pub const DISABLED_FREEZER_TARGET: f32 = 24.0;

impl TargetTemps {
    /// True while the targets sit at the shipped sentinel pair
    pub fn regulation_disabled(&self) -> bool {
        self.heater == DISABLED_HEATER_TARGET && self.freezer == DISABLED_FREEZER_TARGET
    }
}

/// Relay state plus the cooldown deadline (meaningful only while off)
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermalState {
    pub relay_on: bool,
    pub cooldown_until: Option<Instant>,
}

/// Tick-driven hysteresis controller
pub struct ThermalController {
    band: f32,
    cooldown: Duration,
}

impl ThermalController {
    pub fn new(config: &ThermalConfig) -> Self {
        Self {
            band: config.band,
            cooldown: config.cooldown(),
        }
    }

    /// Run one control step against fresh channel readings.
    ///
    /// Returns the relay command to apply when the state changed, `None`
    /// when the relay should stay as it is.
    pub fn tick(
        &self,
        state: &mut ThermalState,
        targets: &TargetTemps,
        heater_c: f32,
        freezer_c: f32,
        now: Instant,
    ) -> Option<bool> {
        if targets.regulation_disabled() {
            state.cooldown_until = None;
            if state.relay_on {
                state.relay_on = false;
                log::info!("thermal: regulation disabled, relay off");
                return Some(false);
            }
            return None;
        }

        let heater_reached = (heater_c - targets.heater).abs() <= self.band;
        let freezer_reached = (freezer_c - targets.freezer).abs() <= self.band;

        if state.relay_on {
            // Either compartment reaching its band ends the burst
            if heater_reached || freezer_reached {
                state.relay_on = false;
                state.cooldown_until = Some(now + self.cooldown);
                log::info!(
                    "thermal: target band reached (heater {:.1}/{:.1}, freezer {:.1}/{:.1}), relay off for {:?}",
                    heater_c,
                    targets.heater,
                    freezer_c,
                    targets.freezer,
                    self.cooldown
                );
                return Some(false);
            }
            return None;
        }

        match state.cooldown_until {
            Some(deadline) if now < deadline => None,
            Some(_) => {
                // Dwell expired; the relay may energize on a later tick
                state.cooldown_until = None;
                log::debug!("thermal: cooldown expired");
                None
            }
            None => {
                if !heater_reached || !freezer_reached {
                    state.relay_on = true;
                    log::info!(
                        "thermal: out of band (heater {:.1}/{:.1}, freezer {:.1}/{:.1}), relay on",
                        heater_c,
                        targets.heater,
                        freezer_c,
                        targets.freezer
                    );
                    return Some(true);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ThermalController {
        ThermalController::new(&ThermalConfig::default())
    }

    fn targets(heater: f32, freezer: f32) -> TargetTemps {
        TargetTemps { heater, freezer }
    }

    #[test]
    fn test_sentinel_targets_force_off() {
        let c = controller();
        let mut st = ThermalState {
            relay_on: true,
            cooldown_until: None,
        };
        let t = targets(25.0, 24.0);
        let now = Instant::now();

        assert_eq!(c.tick(&mut st, &t, 80.0, -20.0, now), Some(false));
        assert!(!st.relay_on);
        // Stays off no matter how far the readings diverge
        assert_eq!(c.tick(&mut st, &t, 80.0, -20.0, now), None);
        assert!(!st.relay_on);
    }

    #[test]
    fn test_turns_on_when_either_channel_diverges() {
        let c = controller();
        let mut st = ThermalState::default();
        let t = targets(30.0, 5.0);
        let now = Instant::now();

        // Heater at target, freezer far off: still a turn-on condition
        assert_eq!(c.tick(&mut st, &t, 30.0, 20.0, now), Some(true));
        assert!(st.relay_on);
    }

    #[test]
    fn test_stays_on_until_a_band_is_reached() {
        let c = controller();
        let mut st = ThermalState::default();
        let t = targets(30.0, 5.0);
        let now = Instant::now();

        assert_eq!(c.tick(&mut st, &t, 22.0, 20.0, now), Some(true));
        // Both still outside their bands: no command
        assert_eq!(c.tick(&mut st, &t, 25.0, 15.0, now), None);
        assert!(st.relay_on);

        // Heater enters 30 +/- 0.5
        assert_eq!(c.tick(&mut st, &t, 29.6, 12.0, now), Some(false));
        assert!(!st.relay_on);
        assert!(st.cooldown_until.is_some());
    }

    #[test]
    fn test_cooldown_blocks_reentry() {
        let c = controller();
        let mut st = ThermalState::default();
        let t = targets(30.0, 5.0);
        let now = Instant::now();

        assert_eq!(c.tick(&mut st, &t, 20.0, 20.0, now), Some(true));
        assert_eq!(c.tick(&mut st, &t, 29.8, 20.0, now), Some(false));

        // Readings re-diverge immediately, but the dwell holds
        let during = now + Duration::from_secs(30);
        assert_eq!(c.tick(&mut st, &t, 20.0, 20.0, during), None);
        assert!(!st.relay_on);

        // First tick past the deadline only clears the marker
        let after = now + Duration::from_secs(61);
        assert_eq!(c.tick(&mut st, &t, 20.0, 20.0, after), None);
        assert!(st.cooldown_until.is_none());

        // The next tick may energize again
        assert_eq!(c.tick(&mut st, &t, 20.0, 20.0, after), Some(true));
        assert!(st.relay_on);
    }

    #[test]
    fn test_in_band_readings_keep_relay_off() {
        let c = controller();
        let mut st = ThermalState::default();
        let t = targets(30.0, 5.0);
        let now = Instant::now();

        assert_eq!(c.tick(&mut st, &t, 30.2, 4.8, now), None);
        assert!(!st.relay_on);
    }

    #[test]
    fn test_band_edge_is_inclusive() {
        let c = controller();
        let mut st = ThermalState {
            relay_on: true,
            cooldown_until: None,
        };
        let t = targets(30.0, 5.0);
        let now = Instant::now();

        // Exactly 0.5 away counts as reached
        assert_eq!(c.tick(&mut st, &t, 30.5, 20.0, now), Some(false));
    }
}
