//! Motion calibration and shake detection
//!
//! The bag reports a one-shot "shaken" event when its orientation or motion
//! deviates sharply from a calibrated rest baseline. Detection runs against
//! raw sensor units; the baseline is a single fresh sample captured at the
//! end of a stillness window, not an average.
//!
//! State machine:
//!
//! ```text
//! Idle --reset()--> Calibrating --(elapsed >= window)--> Calibrated
//!                       ^                                     |
//!                       +------------- reset() ---------------+
//! ```
//!
//! Once a deviation latches the flag, every later query answers true
//! without touching the sensor, until `reset()` clears it and restarts
//! calibration.

use crate::config::MotionConfig;
use crate::drivers::{ImuDriver, ImuSample};
use std::time::{Duration, Instant};

/// Calibration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No baseline requested yet
    Idle,
    /// Waiting out the stillness window
    Calibrating,
    /// Baseline captured, detection active
    Calibrated,
}

/// Calibration state machine plus the sticky shake flag
pub struct ShakeMonitor {
    phase: Phase,
    started: Option<Instant>,
    window: Duration,
    baseline: ImuSample,
    accel_threshold: i32,
    gyro_threshold: i32,
    shaken: bool,
}

impl ShakeMonitor {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            phase: Phase::Idle,
            started: None,
            window: config.calibration_window(),
            baseline: ImuSample::default(),
            accel_threshold: config.accel_threshold,
            gyro_threshold: config.gyro_threshold,
            shaken: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_calibrated(&self) -> bool {
        self.phase == Phase::Calibrated
    }

    /// Current value of the sticky flag, without sampling
    pub fn is_shaken(&self) -> bool {
        self.shaken
    }

    /// Clear the flag and restart calibration, discarding any baseline
    pub fn reset(&mut self, now: Instant) {
        self.shaken = false;
        self.phase = Phase::Calibrating;
        self.started = Some(now);
        log::info!(
            "motion: calibration started, keep the bag still for {:?}",
            self.window
        );
    }

    /// Advance calibration; call every loop iteration.
    ///
    /// When the stillness window has elapsed, one fresh sample becomes the
    /// baseline. A failed read is not fatal, the capture retries on the
    /// next call.
    pub fn update(&mut self, imu: &mut dyn ImuDriver, now: Instant) {
        if self.phase != Phase::Calibrating {
            return;
        }
        let started = match self.started {
            Some(t) => t,
            None => return,
        };
        if now.duration_since(started) < self.window {
            return;
        }

        match imu.read() {
            Ok(sample) => {
                self.baseline = sample;
                self.phase = Phase::Calibrated;
                log::info!(
                    "motion: calibration complete, baseline accel={:?} gyro={:?}",
                    sample.accel,
                    sample.gyro
                );
            }
            Err(e) => log::debug!("motion: baseline read failed, retrying: {}", e),
        }
    }

    /// Sample the sensor and latch the flag on a deviation beyond either
    /// threshold. Returns the (possibly just latched) flag value.
    pub fn check(&mut self, imu: &mut dyn ImuDriver) -> bool {
        if self.shaken {
            return true;
        }
        if self.phase != Phase::Calibrated {
            return false;
        }

        let sample = match imu.read() {
            Ok(s) => s,
            // A read failure is a no-event tick, never an error upstream
            Err(e) => {
                log::debug!("motion: sample read failed: {}", e);
                return false;
            }
        };

        let accel_diff = l1_distance(&sample.accel, &self.baseline.accel);
        let gyro_diff = l1_distance(&sample.gyro, &self.baseline.gyro);

        if accel_diff > self.accel_threshold || gyro_diff > self.gyro_threshold {
            self.shaken = true;
            log::warn!(
                "motion: shake detected, accel_diff={} (threshold {}) gyro_diff={} (threshold {})",
                accel_diff,
                self.accel_threshold,
                gyro_diff,
                self.gyro_threshold
            );
        }
        self.shaken
    }
}

/// Per-axis absolute differences, summed
fn l1_distance(a: &[i16; 3], b: &[i16; 3]) -> i32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as i32 - *y as i32).abs())
        .sum()
}
