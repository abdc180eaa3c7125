//! Error types for the TM BT LED hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the cluster.
#[derive(Error, Debug)]
pub enum Error {
    /// No Bluetooth adapter is available on this host.
    #[error("Bluetooth adapter not found")]
    AdapterNotFound,

    /// The device is not (or no longer) known to the adapter.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The connected device has no characteristic accepting frame writes.
    #[error("State characteristic not found on device")]
    StateCharacteristicMissing,

    /// A write was attempted without an active session.
    #[error("Not connected")]
    NotConnected,

    /// The radio backend does not support the requested operation.
    #[error("Unsupported by radio backend: {0}")]
    Unsupported(&'static str),

    /// A button report was shorter than the fixed report layout.
    #[error("Button report too short: {0} bytes")]
    ShortReport(usize),

    /// No pairing metadata exists for a device.
    #[error("No pairing metadata for device {0}")]
    MetadataNotFound(String),

    /// Bluetooth LE stack error.
    #[error("Bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),

    /// Pairing metadata I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pairing metadata could not be parsed.
    #[error("Invalid pairing metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}
