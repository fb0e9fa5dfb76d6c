//! Thermal actuator driver trait

use crate::error::Result;

/// Binary relay driving the heating/cooling elements
pub trait Relay {
    /// Energize or release the relay
    fn set(&mut self, on: bool) -> Result<()>;
}
