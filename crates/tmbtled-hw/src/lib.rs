//! TM BT LED Hardware Library
//!
//! Wire format and Bluetooth LE link for the Thrustmaster BT LED steering
//! wheel display: two 4-character displays, a 15-segment rev bar, a gear
//! digit and a handful of indicator lamps.

pub mod error;
pub mod frame;
pub mod glyph;
pub mod link;
pub mod pairing;
pub mod protocol;

pub use error::{Error, Result};
pub use frame::{BitRange, Frame, Pattern};
pub use link::{BleRadio, Bindings, LinkEvent, Radio};
pub use pairing::{DeviceId, DeviceMetadata, PairingStore};
pub use protocol::{ButtonEdge, ButtonReport, ButtonTracker, ConnectionParameters, Direction, Side};

/// Default performance connection interval in milliseconds.
pub const DEFAULT_TARGET_INTERVAL_MS: f64 = 17.5;

/// Default write loop period in milliseconds.
pub const DEFAULT_REFRESH_INTERVAL_MS: f64 = 250.0;
