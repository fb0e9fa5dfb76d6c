//! Motion sensor driver trait

use crate::error::Result;

/// One raw accelerometer + gyroscope sample
///
/// Values are signed 16-bit register words as the sensor produces them
/// (±2 g range: 16384 counts per g; gravity shows as Z ≈ +16384 at rest).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImuSample {
    /// Acceleration [x, y, z]
    pub accel: [i16; 3],
    /// Angular rate [x, y, z]
    pub gyro: [i16; 3],
}

/// Motion sensor driver trait
pub trait ImuDriver {
    /// Read one sample; synchronous, sub-millisecond
    fn read(&mut self) -> Result<ImuSample>;
}
