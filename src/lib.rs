//! iBag network-and-control engine
//!
//! The on-device core of an insulated transport bag that serves a phone
//! over a local Wi-Fi access point:
//!
//! - [`dhcp`]: minimal lease responder so the phone can join the AP
//! - [`http`]: hand-rolled HTTP/1.1 gateway for status, configuration and
//!   shake-alarm reset
//! - [`motion`]: rest-baseline calibration and sticky shake detection
//! - [`thermal`]: bang-bang relay control with a cooldown dwell
//!
//! Hardware and the IP stack sit behind traits ([`drivers`],
//! [`transport`]); [`devices::mock`] provides a full simulated bag for
//! hardware-free runs and tests. Everything executes on one cooperative
//! thread driven by [`app::BagApp`].

pub mod app;
pub mod assets;
pub mod config;
pub mod devices;
pub mod dhcp;
pub mod drivers;
pub mod error;
pub mod http;
pub mod json;
pub mod motion;
pub mod state;
pub mod thermal;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
