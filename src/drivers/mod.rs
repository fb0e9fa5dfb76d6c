//! Hardware driver traits
//!
//! The engine never touches registers, buses, or pins directly; it consumes
//! these traits. Real bindings live with the board support layer, the
//! in-tree `devices::mock` simulator implements all of them.

pub mod imu;
pub mod led;
pub mod relay;
pub mod thermo;

pub use imu::{ImuDriver, ImuSample};
pub use led::StatusLed;
pub use relay::Relay;
pub use thermo::{TempChannel, TempSensor};
