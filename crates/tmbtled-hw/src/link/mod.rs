//! Radio link module.
//!
//! Abstracts the Bluetooth LE central so the link manager can be driven by
//! the real `btleplug` backend or by a test double.

mod device;

pub use device::BleRadio;

use crate::pairing::{DeviceId, DeviceMetadata};
use crate::protocol::ConnectionParameters;
use crate::Result;
use std::future::Future;

/// Capacity of the inbound event queue.
pub const EVENT_QUEUE_SIZE: usize = 64;

/// Events delivered by the radio backend.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// A peripheral was seen while scanning.
    Discovered(DeviceId),
    /// A connected peripheral went away.
    Disconnected(DeviceId),
    /// A button report notification.
    Report(Vec<u8>),
    /// The peer asked for new connection parameters.
    ConnectionParametersRequested {
        min_interval_ms: f64,
        max_interval_ms: f64,
    },
    /// New connection parameters took effect.
    ConnectionUpdated { interval_ms: f64 },
}

/// Characteristics bound by a successful connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    /// Whether button reports will be delivered.
    pub events: bool,
}

/// A Bluetooth LE central able to talk to one cluster at a time.
pub trait Radio {
    /// Starts scanning for peripherals.
    fn start_scan(&mut self) -> impl Future<Output = Result<()>>;

    /// Stops scanning.
    fn stop_scan(&mut self) -> impl Future<Output = Result<()>>;

    /// Connects and binds the state and events characteristics.
    ///
    /// Fails when the state characteristic cannot be bound.
    fn connect(
        &mut self,
        device: &DeviceId,
        metadata: &DeviceMetadata,
    ) -> impl Future<Output = Result<Bindings>>;

    /// Drops the current connection, if any.
    fn disconnect(&mut self) -> impl Future<Output = Result<()>>;

    /// Writes a packed frame without waiting for a response.
    fn write_frame(&mut self, frame: &[u8]) -> impl Future<Output = Result<()>>;

    /// Requests new connection parameters from the peer.
    fn update_connection(
        &mut self,
        params: ConnectionParameters,
    ) -> impl Future<Output = Result<()>>;
}
