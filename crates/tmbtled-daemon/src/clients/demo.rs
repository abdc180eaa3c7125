//! Demo client exercising every part of the cluster without a game.

use super::{Client, DEFAULT_POLL_INTERVAL};
use crate::driver::DisplayDriver;
use std::time::Duration;
use tmbtled_hw::{Direction, Side};
use tracing::debug;

const LEFT_MODES: [&str; 2] = ["RPM", "SPEED"];
const RIGHT_MODES: [&str; 2] = ["LAP", "DIFF"];

/// Rev bar change per update, in percent.
const REV_STEP: f64 = 3.0;

/// Sweeps RPM, times, gear and the rev bar with every lamp flashing.
#[derive(Debug, Clone)]
pub struct DemoClient {
    poll_interval: Duration,
    step: u64,
    rev_percent: f64,
    rev_falling: bool,
    left_mode: usize,
    right_mode: usize,
}

impl DemoClient {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            step: 0,
            rev_percent: 0.0,
            rev_falling: false,
            left_mode: 0,
            right_mode: 0,
        }
    }

    fn advance_rev_bar(&mut self) {
        if self.rev_falling {
            self.rev_percent -= REV_STEP;
            if self.rev_percent < 0.0 {
                self.rev_percent = 0.0;
                self.rev_falling = false;
            }
        } else {
            self.rev_percent += REV_STEP;
            if self.rev_percent > 100.0 {
                self.rev_percent = 100.0;
                self.rev_falling = true;
            }
        }
    }
}

impl Default for DemoClient {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Client for DemoClient {
    fn name(&self) -> &str {
        "demo"
    }

    fn start(&mut self, driver: &mut dyn DisplayDriver) -> anyhow::Result<()> {
        driver.reset();
        driver.set_modes(
            Side::Left,
            LEFT_MODES.iter().map(|m| m.to_string()).collect(),
        );
        driver.set_modes(
            Side::Right,
            RIGHT_MODES.iter().map(|m| m.to_string()).collect(),
        );
        driver.show_message("DEMO");
        driver.set_performance_mode();
        Ok(())
    }

    fn update(&mut self, driver: &mut dyn DisplayDriver) -> anyhow::Result<()> {
        self.step += 1;
        let step = self.step as f64;
        let rpm = (self.step * 97 % 14001) as f64;

        match self.left_mode {
            0 => driver.set_rpm(rpm, Side::Left),
            _ => driver.set_speed(rpm / 40.0, Side::Left),
        }
        match self.right_mode {
            0 => driver.set_time(Some((self.step * 53 % 5001) as f64), Side::Right),
            _ => driver.set_diff_time(Some((step * 7.0) % 4000.0 - 2000.0), Side::Right),
        }

        driver.set_gear(Some((self.step / 30 % 10) as i32));
        self.advance_rev_bar();
        driver.set_rev_lights_without_blue(self.rev_percent);
        driver.set_all_flashing(true);
        driver.set_rev_lights_blue_flashing(true);
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn on_mode_changed(
        &mut self,
        _driver: &mut dyn DisplayDriver,
        side: Side,
        direction: Direction,
        index: usize,
    ) {
        debug!("Demo {} mode {:?} -> {}", side, direction, index);
        match side {
            Side::Left => self.left_mode = index,
            Side::Right => self.right_mode = index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitSystem;
    use crate::driver::Driver;
    use crate::indicators::Indicator;
    use crate::timers::TimerKey;

    #[tokio::test(start_paused = true)]
    async fn test_updates_do_not_stack_timers() {
        let mut driver = Driver::new(UnitSystem::Metric, Duration::from_millis(3000));
        let mut client = DemoClient::default();
        client.start(&mut driver).unwrap();

        for _ in 0..120 {
            client.update(&mut driver).unwrap();
        }

        let timers = driver.timers();
        for indicator in [
            Indicator::Yellow,
            Indicator::Red,
            Indicator::Blue,
            Indicator::RevLightsBlue,
        ] {
            assert!(timers.is_active(TimerKey::Flash(indicator)));
        }
        assert_eq!(timers.cancelled(), 0);
    }

    #[test]
    fn test_rev_bar_bounces() {
        let mut client = DemoClient::default();
        for _ in 0..34 {
            client.advance_rev_bar();
        }
        assert_eq!(client.rev_percent, 100.0);
        assert!(client.rev_falling);

        client.advance_rev_bar();
        assert_eq!(client.rev_percent, 97.0);
    }

    #[test]
    fn test_mode_change_switches_field() {
        let mut driver = Driver::new(UnitSystem::Metric, Duration::from_millis(3000));
        let mut client = DemoClient::default();
        client.on_mode_changed(&mut driver, Side::Right, Direction::Next, 1);
        assert_eq!(client.right_mode, 1);
        assert_eq!(client.left_mode, 0);
    }
}
