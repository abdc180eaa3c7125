//! Telemetry clients.
//!
//! A client feeds values into a [`DisplayDriver`] on every poll tick and
//! reacts to mode button presses.

mod demo;
mod idle;

pub use demo::DemoClient;
pub use idle::IdleClient;

use crate::driver::DisplayDriver;
use std::time::Duration;
use tmbtled_hw::{Direction, Side};

/// Default client poll period (about 60 Hz).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// A source of telemetry for the cluster.
pub trait Client {
    /// Client name for logs.
    fn name(&self) -> &str;

    /// Called once before the first update.
    fn start(&mut self, driver: &mut dyn DisplayDriver) -> anyhow::Result<()>;

    /// Pushes the latest values into the driver.
    fn update(&mut self, driver: &mut dyn DisplayDriver) -> anyhow::Result<()>;

    /// Called once on shutdown.
    fn stop(&mut self, _driver: &mut dyn DisplayDriver) {}

    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// A mode button moved a side to mode `index`.
    fn on_mode_changed(
        &mut self,
        _driver: &mut dyn DisplayDriver,
        _side: Side,
        _direction: Direction,
        _index: usize,
    ) {
    }
}
