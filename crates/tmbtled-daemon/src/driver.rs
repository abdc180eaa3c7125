//! Display driver: telemetry setters on top of the frame.
//!
//! [`DisplayDriver`] is the surface telemetry clients program against.
//! [`Driver`] implements it and owns the frame, the timers and every
//! overlay and indicator state machine.

use crate::config::UnitSystem;
use crate::display::{Overlays, DISPLAY_WIDTH};
use crate::format::{self, Reading, Spacer};
use crate::indicators::{FlashMode, Indicator, Indicators};
use crate::modes::ModeCycle;
use crate::timers::{TimerKey, Timers};
use std::time::Duration;
use tmbtled_hw::frame::FRAME_SIZE;
use tmbtled_hw::glyph::{gear_pattern, glyph};
use tmbtled_hw::{BitRange, Direction, Frame, Side};
use tokio::time::Instant;
use tracing::{debug, info};

/// Connection profile requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Short connection interval for live telemetry.
    Performance,
    /// Long connection interval while idle.
    PowerSave,
}

/// Everything a telemetry client can do to the cluster.
pub trait DisplayDriver {
    /// Speed in km/h.
    fn set_speed(&mut self, kmh: f64, side: Side);
    fn set_rpm(&mut self, rpm: f64, side: Side);
    /// Gear number, `-1` for reverse and `0` for neutral; `None` blanks the digit.
    fn set_gear(&mut self, gear: Option<i32>);
    /// Temperature in degrees Celsius.
    fn set_temperature(&mut self, celsius: f64, side: Side);
    /// Weight in kilograms.
    fn set_weight(&mut self, kg: f64, side: Side);
    fn set_float(&mut self, value: f64, side: Side);
    fn set_int(&mut self, value: f64, side: Side);
    /// Lap time in milliseconds.
    fn set_time(&mut self, ms: Option<f64>, side: Side);
    /// Signed time difference in milliseconds.
    fn set_diff_time(&mut self, ms: Option<f64>, side: Side);
    fn set_text(&mut self, text: &str, side: Side);

    /// Steady on/off for a lamp or bar.
    fn set_lamp(&mut self, indicator: Indicator, on: bool);
    fn set_flashing(&mut self, indicator: Indicator, mode: FlashMode);

    fn set_rev_lights(&mut self, percent: f64);
    fn set_rev_lights_without_blue(&mut self, percent: f64);
    fn set_rev_lights_without_green(&mut self, percent: f64, min: f64);

    fn set_modes(&mut self, side: Side, modes: Vec<String>);
    fn current_mode(&self, side: Side) -> usize;

    /// Restores the default frame and stops all flashing and the ticker.
    fn reset(&mut self);
    /// Shows a temporary message on each side.
    fn show_temporary(&mut self, left: &str, right: &str);
    fn show_ticker(&mut self, message: &str);
    fn stop_ticker(&mut self);

    fn set_performance_mode(&mut self);
    fn set_power_save_mode(&mut self);

    /// Shows an 8-character message split across both sides.
    fn show_message(&mut self, text: &str) {
        let upper: Vec<char> = text.to_uppercase().chars().collect();
        let left: String = upper.iter().take(DISPLAY_WIDTH).collect();
        let right: String = upper
            .iter()
            .skip(DISPLAY_WIDTH)
            .take(DISPLAY_WIDTH)
            .collect();
        self.show_temporary(&left, &right);
    }

    fn show_game_title(&mut self, title: &str) {
        self.show_message(title);
    }

    fn set_gear_dot(&mut self, on: bool) {
        self.set_lamp(Indicator::GearDot, on);
    }

    fn set_gear_dot_flashing(&mut self, mode: FlashMode) {
        self.set_flashing(Indicator::GearDot, mode);
    }

    fn set_rev_lights_flashing(&mut self, mode: FlashMode) {
        self.set_flashing(Indicator::RevLights, mode);
    }

    fn set_rev_lights_blue_flashing(&mut self, flash: bool) {
        self.set_flashing(Indicator::RevLightsBlue, flash.into());
    }

    fn set_flashing_yellow(&mut self, flash: bool) {
        self.set_flashing(Indicator::Yellow, flash.into());
    }

    fn set_flashing_left_yellow(&mut self, flash: bool) {
        self.set_flashing(Indicator::LeftYellow, flash.into());
    }

    fn set_flashing_right_yellow(&mut self, flash: bool) {
        self.set_flashing(Indicator::RightYellow, flash.into());
    }

    fn set_flashing_red(&mut self, flash: bool) {
        self.set_flashing(Indicator::Red, flash.into());
    }

    fn set_flashing_right_red(&mut self, flash: bool) {
        self.set_flashing(Indicator::RightRed, flash.into());
    }

    fn set_flashing_blue(&mut self, flash: bool) {
        self.set_flashing(Indicator::Blue, flash.into());
    }

    fn set_all_colors(&mut self, on: bool) {
        for indicator in [Indicator::Blue, Indicator::Red, Indicator::Yellow] {
            self.set_lamp(indicator, on);
        }
    }

    fn set_all_flashing(&mut self, flash: bool) {
        self.set_flashing_blue(flash);
        self.set_flashing_yellow(flash);
        self.set_flashing_red(flash);
    }
}

/// The cluster state machine.
#[derive(Debug)]
pub struct Driver {
    frame: Frame,
    units: UnitSystem,
    timers: Timers,
    indicators: Indicators,
    overlays: Overlays,
    modes: [ModeCycle; 2],
    temporary_duration: Duration,
    profile_request: Option<Profile>,
}

impl Driver {
    /// Creates a driver showing the default frame.
    pub fn new(units: UnitSystem, temporary_duration: Duration) -> Self {
        Self {
            frame: Frame::default(),
            units,
            timers: Timers::new(),
            indicators: Indicators::new(),
            overlays: Overlays::new(),
            modes: [ModeCycle::new(), ModeCycle::new()],
            temporary_duration,
            profile_request: None,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Packed frame for transmission.
    pub fn pack(&self) -> [u8; FRAME_SIZE] {
        self.frame.pack()
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    /// When the next timer fires, if any is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Runs every timer due at `now`.
    pub fn fire_due_timers(&mut self, now: Instant) {
        while let Some(key) = self.timers.pop_due(now) {
            match key {
                TimerKey::Flash(indicator) => self.indicators.toggle(&mut self.frame, indicator),
                TimerKey::TemporaryExpiry(side) => {
                    debug!("Temporary message on {} side expired", side);
                    self.overlays.expire(&mut self.timers, side);
                }
                TimerKey::ScrollDelay(side) => self.overlays.start_scroll(&mut self.timers, side),
                TimerKey::Scroll(side) => {
                    if let Some(text) = self.overlays.scroll(&mut self.timers, side) {
                        self.write_text(side, &text);
                    }
                }
                TimerKey::Ticker => {
                    if let Some([left, right]) = self.overlays.tick() {
                        self.write_text(Side::Left, &left);
                        self.write_text(Side::Right, &right);
                    }
                }
            }
        }
    }

    /// Shows a temporary message on one side.
    pub fn show_temporary_on(&mut self, side: Side, message: &str, duration: Duration) {
        if let Some(text) = self
            .overlays
            .show(&mut self.timers, side, message, duration)
        {
            self.set_time_spacer(side, false);
            self.write_text(side, &text);
        }
    }

    /// Handles a mode button press and flashes the new mode name.
    pub fn cycle_mode(&mut self, side: Side, direction: Direction) -> Option<usize> {
        let index = self.modes[side.index()].step(direction)?;
        if let Some(name) = self.modes[side.index()].current_name().map(str::to_string) {
            self.show_temporary_on(side, &name, self.temporary_duration);
        }
        Some(index)
    }

    /// Takes the pending connection profile request.
    pub fn take_profile_request(&mut self) -> Option<Profile> {
        self.profile_request.take()
    }

    fn set_time_spacer(&mut self, side: Side, on: bool) {
        self.frame.set_bit(BitRange::time_spacer(side), 0, on);
    }

    /// Writes plain text, ignoring decimal points.
    fn write_text(&mut self, side: Side, text: &str) {
        for (index, c) in format::text_cells(text).into_iter().enumerate() {
            self.frame
                .write(BitRange::char_cell(side, index), glyph(c), false);
        }
    }

    /// Writes numeric text, folding decimal points into their cells.
    fn write_number(&mut self, side: Side, text: &str) {
        for (index, (c, dot)) in format::number_cells(text).into_iter().enumerate() {
            self.frame
                .write(BitRange::char_cell(side, index), glyph(c), dot);
        }
    }

    /// Steady-state write, dropped while a temporary message owns the side.
    fn update_display(&mut self, side: Side, reading: Reading) {
        if self.overlays.is_occupied(side) {
            return;
        }

        match reading.spacer {
            Spacer::On => self.set_time_spacer(side, true),
            Spacer::Off => self.set_time_spacer(side, false),
            Spacer::Unchanged => {}
        }

        if format::is_numeric(&reading.text) {
            self.write_number(side, &reading.text);
        } else {
            self.write_text(side, &reading.text);
        }
    }

    fn update_text(&mut self, side: Side, text: String) {
        self.update_display(
            side,
            Reading {
                text,
                spacer: Spacer::Unchanged,
            },
        );
    }
}

impl DisplayDriver for Driver {
    fn set_speed(&mut self, kmh: f64, side: Side) {
        let text = format::speed(kmh, self.units);
        self.update_text(side, text);
    }

    fn set_rpm(&mut self, rpm: f64, side: Side) {
        self.update_text(side, format::rpm(rpm));
    }

    fn set_gear(&mut self, gear: Option<i32>) {
        self.frame.write(BitRange::Gear, gear_pattern(gear), false);
    }

    fn set_temperature(&mut self, celsius: f64, side: Side) {
        let text = format::temperature(celsius, self.units);
        self.update_text(side, text);
    }

    fn set_weight(&mut self, kg: f64, side: Side) {
        let text = format::weight(kg, self.units);
        self.update_text(side, text);
    }

    fn set_float(&mut self, value: f64, side: Side) {
        self.update_text(side, format::float(value));
    }

    fn set_int(&mut self, value: f64, side: Side) {
        self.update_text(side, format::int(value));
    }

    fn set_time(&mut self, ms: Option<f64>, side: Side) {
        self.update_display(side, format::lap_time(ms));
    }

    fn set_diff_time(&mut self, ms: Option<f64>, side: Side) {
        self.update_display(side, format::delta_time(ms));
    }

    fn set_text(&mut self, text: &str, side: Side) {
        self.update_text(side, text.to_string());
    }

    fn set_lamp(&mut self, indicator: Indicator, on: bool) {
        self.indicators.set_lit(&mut self.frame, indicator, on);
    }

    fn set_flashing(&mut self, indicator: Indicator, mode: FlashMode) {
        if self
            .indicators
            .set_flashing(&mut self.frame, &mut self.timers, indicator, mode)
        {
            debug!("{} flashing: {:?}", indicator, mode);
        }
    }

    fn set_rev_lights(&mut self, percent: f64) {
        self.indicators.rev_lights(&mut self.frame, percent);
    }

    fn set_rev_lights_without_blue(&mut self, percent: f64) {
        self.indicators
            .rev_lights_without_blue(&mut self.frame, percent);
    }

    fn set_rev_lights_without_green(&mut self, percent: f64, min: f64) {
        self.indicators
            .rev_lights_without_green(&mut self.frame, percent, min);
    }

    fn set_modes(&mut self, side: Side, modes: Vec<String>) {
        self.modes[side.index()].set_modes(modes);
    }

    fn current_mode(&self, side: Side) -> usize {
        self.modes[side.index()].current()
    }

    fn reset(&mut self) {
        self.indicators.reset(&mut self.timers);
        self.overlays.stop_ticker(&mut self.timers);
        self.frame = Frame::default();
    }

    fn show_temporary(&mut self, left: &str, right: &str) {
        let duration = self.temporary_duration;
        self.show_temporary_on(Side::Left, left, duration);
        self.show_temporary_on(Side::Right, right, duration);
    }

    fn show_ticker(&mut self, message: &str) {
        self.set_time_spacer(Side::Left, false);
        self.set_time_spacer(Side::Right, false);
        let [left, right] = self.overlays.start_ticker(&mut self.timers, message);
        self.write_text(Side::Left, &left);
        self.write_text(Side::Right, &right);
    }

    fn stop_ticker(&mut self) {
        self.overlays.stop_ticker(&mut self.timers);
    }

    fn set_performance_mode(&mut self) {
        info!("Switching to performance mode");
        self.profile_request = Some(Profile::Performance);
    }

    fn set_power_save_mode(&mut self) {
        info!("Switching to power save mode");
        self.profile_request = Some(Profile::PowerSave);
    }
}
