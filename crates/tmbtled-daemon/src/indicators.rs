//! Indicator lamps, the rev bar and their flash state machines.
//!
//! Each indicator owns at most one repeating [`TimerKey::Flash`] timer.
//! Requesting the mode an indicator is already in never touches its timer.

use crate::timers::{TimerKey, Timers};
use std::collections::HashMap;
use std::time::Duration;
use tmbtled_hw::{BitRange, Frame};

/// Toggle period of the blue rev bar segment.
const BLUE_FLASH_PERIOD: Duration = Duration::from_millis(100);

/// Lamps and bars that can be lit or flashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Both yellow lamps, with their own shared timer.
    Yellow,
    LeftYellow,
    RightYellow,
    Red,
    LeftRed,
    RightRed,
    Blue,
    LeftBlue,
    RightBlue,
    /// Active-low dot next to the gear digit.
    GearDot,
    /// The whole 15-segment rev bar.
    RevLights,
    /// The blue top segment of the rev bar.
    RevLightsBlue,
}

impl Indicator {
    /// Every indicator.
    pub const ALL: [Indicator; 12] = [
        Indicator::Yellow,
        Indicator::LeftYellow,
        Indicator::RightYellow,
        Indicator::Red,
        Indicator::LeftRed,
        Indicator::RightRed,
        Indicator::Blue,
        Indicator::LeftBlue,
        Indicator::RightBlue,
        Indicator::GearDot,
        Indicator::RevLights,
        Indicator::RevLightsBlue,
    ];

    /// Single-bit lamps driven by this indicator.
    pub fn lamps(self) -> &'static [BitRange] {
        match self {
            Indicator::Yellow => &[BitRange::LeftYellow, BitRange::RightYellow],
            Indicator::LeftYellow => &[BitRange::LeftYellow],
            Indicator::RightYellow => &[BitRange::RightYellow],
            Indicator::Red => &[BitRange::LeftRed, BitRange::RightRed],
            Indicator::LeftRed => &[BitRange::LeftRed],
            Indicator::RightRed => &[BitRange::RightRed],
            Indicator::Blue => &[BitRange::LeftBlue, BitRange::RightBlue],
            Indicator::LeftBlue => &[BitRange::LeftBlue],
            Indicator::RightBlue => &[BitRange::RightBlue],
            Indicator::GearDot => &[BitRange::GearDot],
            Indicator::RevLights | Indicator::RevLightsBlue => &[],
        }
    }

    /// Returns true if the lamp lights when its bit is clear.
    fn active_low(self) -> bool {
        self == Indicator::GearDot
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Indicator::Yellow => "yellow",
            Indicator::LeftYellow => "left-yellow",
            Indicator::RightYellow => "right-yellow",
            Indicator::Red => "red",
            Indicator::LeftRed => "left-red",
            Indicator::RightRed => "right-red",
            Indicator::Blue => "blue",
            Indicator::LeftBlue => "left-blue",
            Indicator::RightBlue => "right-blue",
            Indicator::GearDot => "gear-dot",
            Indicator::RevLights => "rev-lights",
            Indicator::RevLightsBlue => "rev-lights-blue",
        };
        write!(f, "{}", name)
    }
}

/// Flash rate of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashMode {
    #[default]
    Off,
    Slow,
    Fast,
}

impl FlashMode {
    /// Toggle period for this mode, `None` when off.
    pub fn period(self) -> Option<Duration> {
        match self {
            FlashMode::Off => None,
            FlashMode::Slow => Some(Duration::from_millis(500)),
            FlashMode::Fast => Some(Duration::from_millis(250)),
        }
    }
}

impl From<bool> for FlashMode {
    fn from(flash: bool) -> Self {
        if flash {
            FlashMode::Slow
        } else {
            FlashMode::Off
        }
    }
}

/// Clamps a percentage to `[0, 100]`, NaN reading as 0.
fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Lights the last `count` bits of a range, clearing the rest.
fn fill_from_end(frame: &mut Frame, range: BitRange, count: usize) {
    let width = range.width();
    let first_lit = width.saturating_sub(count);
    for index in 0..width {
        frame.set_bit(range, index, index >= first_lit);
    }
}

/// Lit segment count for one half of a two-colour bar.
fn half_count(percent: f64, width: usize) -> (usize, usize) {
    let lit = |p: f64| ((p * width as f64 / 50.0).floor() as usize).min(width);
    if percent < 50.0 {
        (lit(percent), 0)
    } else {
        (width, lit(percent - 50.0))
    }
}

/// Flash state of every indicator.
#[derive(Debug, Default)]
pub struct Indicators {
    modes: HashMap<Indicator, FlashMode>,
    rev_lights_on: bool,
}

impl Indicators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current flash mode of an indicator.
    pub fn mode(&self, indicator: Indicator) -> FlashMode {
        self.modes.get(&indicator).copied().unwrap_or_default()
    }

    pub fn is_flashing(&self, indicator: Indicator) -> bool {
        self.mode(indicator) != FlashMode::Off
    }

    /// Changes the flash mode of an indicator.
    ///
    /// Returns true if the state machine changed state.
    pub fn set_flashing(
        &mut self,
        frame: &mut Frame,
        timers: &mut Timers,
        indicator: Indicator,
        mode: FlashMode,
    ) -> bool {
        let current = self.mode(indicator);
        if mode == current {
            return false;
        }

        let period = match (indicator, mode.period()) {
            (_, None) => {
                timers.cancel(TimerKey::Flash(indicator));
                self.modes.remove(&indicator);
                self.set_lit(frame, indicator, false);
                return true;
            }
            (Indicator::RevLightsBlue, Some(_)) => BLUE_FLASH_PERIOD,
            (_, Some(period)) => period,
        };
        timers.schedule_repeating(TimerKey::Flash(indicator), period);
        self.modes.insert(indicator, mode);
        true
    }

    /// Steady on/off for an indicator. A flashing indicator keeps flashing.
    pub fn set_lit(&self, frame: &mut Frame, indicator: Indicator, on: bool) {
        match indicator {
            Indicator::RevLights => self.rev_lights(frame, if on { 100.0 } else { 0.0 }),
            Indicator::RevLightsBlue => {
                fill_from_end(frame, BitRange::RevLightsBlue, if on { 5 } else { 0 })
            }
            lamp => {
                let bit = on != lamp.active_low();
                for &range in lamp.lamps() {
                    frame.set_bit(range, 0, bit);
                }
            }
        }
    }

    /// One flash step, touching only the indicator's own bits.
    pub fn toggle(&mut self, frame: &mut Frame, indicator: Indicator) {
        match indicator {
            Indicator::RevLights => {
                self.rev_lights_on = !self.rev_lights_on;
                self.rev_lights(frame, if self.rev_lights_on { 100.0 } else { 0.0 });
            }
            Indicator::RevLightsBlue => {
                for index in 0..BitRange::RevLightsBlue.width() {
                    frame.flip_bit(BitRange::RevLightsBlue, index);
                }
            }
            lamp => {
                for &range in lamp.lamps() {
                    frame.flip_bit(range, 0);
                }
            }
        }
    }

    /// Full rev bar: 8 segments for the first half, 7 for the second.
    ///
    /// While the blue segment flashes its bits are left alone.
    pub fn rev_lights(&self, frame: &mut Frame, percent: f64) {
        let percent = clamp_percent(percent);
        let (first, _) = half_count(percent, BitRange::RevLights1.width());
        let second = if percent >= 50.0 {
            half_count(percent, BitRange::RevLights2.width()).1
        } else {
            0
        };

        fill_from_end(frame, BitRange::RevLights1, first);

        let width = BitRange::RevLights2.width();
        let first_lit = width.saturating_sub(second);
        let blue_flashing = self.is_flashing(Indicator::RevLightsBlue);
        for index in 0..width {
            if blue_flashing && index < BitRange::RevLightsBlue.width() {
                continue;
            }
            frame.set_bit(BitRange::RevLights2, index, index >= first_lit);
        }
    }

    /// Green then red; the blue segment is not touched.
    pub fn rev_lights_without_blue(&self, frame: &mut Frame, percent: f64) {
        let (green, red) = half_count(clamp_percent(percent), 5);
        fill_from_end(frame, BitRange::RevLightsGreen, green);
        Self::red(frame, red);
    }

    /// Red then blue over `[min, 100]`; the green segment is not touched.
    pub fn rev_lights_without_green(&self, frame: &mut Frame, percent: f64, min: f64) {
        let percent = clamp_percent(percent);
        let scaled = if percent < min {
            0.0
        } else if min >= 100.0 {
            100.0
        } else {
            (percent - min) / (100.0 - min) * 100.0
        };

        let (red, blue) = half_count(clamp_percent(scaled), 5);
        Self::red(frame, red);
        if !self.is_flashing(Indicator::RevLightsBlue) {
            fill_from_end(frame, BitRange::RevLightsBlue, blue);
        }
    }

    /// Red segment, split across two ranges and lit from the top.
    fn red(frame: &mut Frame, count: usize) {
        let low = BitRange::RevLightsRed1.width();
        fill_from_end(frame, BitRange::RevLightsRed1, count.min(low));
        fill_from_end(frame, BitRange::RevLightsRed2, count.saturating_sub(low));
    }

    /// Stops every flash timer and clears all flash state.
    pub fn reset(&mut self, timers: &mut Timers) {
        for indicator in Indicator::ALL {
            timers.cancel(TimerKey::Flash(indicator));
        }
        self.modes.clear();
        self.rev_lights_on = false;
    }
}
