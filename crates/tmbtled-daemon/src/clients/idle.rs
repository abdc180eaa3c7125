//! Client used while no game is feeding telemetry.

use super::Client;
use crate::driver::DisplayDriver;
use std::time::Duration;
use tracing::info;

/// Message shown when nothing else is configured.
const NO_GAME: &str = "NO  GAME";

/// Shows "NO GAME" in power-save mode, or runs a ticker message.
#[derive(Debug, Clone, Default)]
pub struct IdleClient {
    message: Option<String>,
    lights: bool,
}

impl IdleClient {
    /// Creates an idle client. `lights` turns on every lamp and the rev bar.
    pub fn new(message: Option<String>, lights: bool) -> Self {
        Self {
            message: message.filter(|m| !m.is_empty()),
            lights,
        }
    }
}

impl Client for IdleClient {
    fn name(&self) -> &str {
        "idle"
    }

    fn start(&mut self, driver: &mut dyn DisplayDriver) -> anyhow::Result<()> {
        driver.reset();

        if self.lights {
            driver.set_all_colors(true);
            driver.set_rev_lights(100.0);
        }

        match &self.message {
            Some(message) => {
                info!("Showing ticker: {}", message);
                driver.set_performance_mode();
                driver.show_ticker(message);
            }
            None => {
                driver.show_message(NO_GAME);
                driver.set_power_save_mode();
            }
        }
        Ok(())
    }

    fn update(&mut self, _driver: &mut dyn DisplayDriver) -> anyhow::Result<()> {
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(250)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitSystem;
    use crate::driver::{Driver, Profile};
    use tmbtled_hw::{BitRange, Side};

    fn driver() -> Driver {
        Driver::new(UnitSystem::Metric, Duration::from_millis(3000))
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_game_uses_power_save() {
        let mut driver = driver();
        let mut client = IdleClient::new(None, false);
        client.start(&mut driver).unwrap();

        assert_eq!(driver.take_profile_request(), Some(Profile::PowerSave));
        assert_eq!(driver.overlays().message(Side::Left).as_deref(), Some("NO  "));
        assert_eq!(driver.overlays().message(Side::Right).as_deref(), Some("GAME"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_runs_ticker() {
        let mut driver = driver();
        let mut client = IdleClient::new(Some("WELCOME TO THE TRACK".to_string()), false);
        client.start(&mut driver).unwrap();

        assert_eq!(driver.take_profile_request(), Some(Profile::Performance));
        assert!(driver.overlays().is_ticker_running());
        assert!(!driver.overlays().is_occupied(Side::Left));
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_lights() {
        let mut driver = driver();
        let mut client = IdleClient::new(Some(String::new()), true);
        client.start(&mut driver).unwrap();

        for lamp in [BitRange::LeftYellow, BitRange::RightRed, BitRange::LeftBlue] {
            assert!(driver.frame().bit(lamp, 0));
        }
        assert!((0..8).all(|i| driver.frame().bit(BitRange::RevLights1, i)));
        assert_eq!(driver.take_profile_request(), Some(Profile::PowerSave));
    }
}
