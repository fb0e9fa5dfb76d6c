//! Error types for the iBag engine

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// iBag engine error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse error
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration serialize error
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Unknown device type in configuration
    #[error("Unknown device type: {0}")]
    UnknownDevice(String),

    /// Invalid packet or frame
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Sensor read failure
    #[error("Sensor read failed: {0}")]
    Sensor(&'static str),

    /// Connection no longer tracked by the transport
    #[error("Unknown connection: {0}")]
    UnknownConnection(u64),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
