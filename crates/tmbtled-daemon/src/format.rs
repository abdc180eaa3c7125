//! Telemetry value formatting for the 4-character displays.

use crate::config::UnitSystem;

/// Text shown when a time value carries no data.
pub const NO_DATA: &str = "----";

/// Times at or above this many milliseconds mean "no data".
const TIME_SENTINEL_MS: f64 = 2_147_483_647.0;

const MPH_PER_KMH: f64 = 0.621371;
const LB_PER_KG: f64 = 2.204_622_62;

/// Requested change to a side's time spacer lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spacer {
    Unchanged,
    On,
    Off,
}

/// A formatted value plus its spacer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub text: String,
    pub spacer: Spacer,
}

impl Reading {
    fn new(text: impl Into<String>, spacer: Spacer) -> Self {
        Self {
            text: text.into(),
            spacer,
        }
    }

    fn no_data() -> Self {
        Self::new(NO_DATA, Spacer::On)
    }
}

/// Maps negative values and NaN to zero.
fn clamp(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Degrees Celsius in, 1 decimal (none once the value reaches 1000).
pub fn temperature(celsius: f64, units: UnitSystem) -> String {
    let mut value = clamp(celsius);
    if units == UnitSystem::Imperial {
        value = value * 9.0 / 5.0 + 32.0;
    }
    if value >= 1000.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// Kilograms in, 1 decimal.
pub fn weight(kg: f64, units: UnitSystem) -> String {
    let mut value = clamp(kg);
    if units == UnitSystem::Imperial {
        value *= LB_PER_KG;
    }
    format!("{:.1}", value)
}

pub fn float(value: f64) -> String {
    format!("{:.1}", clamp(value))
}

/// Truncates toward zero and clamps.
pub fn int(value: f64) -> String {
    format!("{:.0}", clamp(value.trunc()))
}

/// Kilometres per hour in, no decimals.
pub fn speed(kmh: f64, units: UnitSystem) -> String {
    let mut value = clamp(kmh.trunc());
    if units == UnitSystem::Imperial {
        value *= MPH_PER_KMH;
    }
    format!("{:.0}", value)
}

/// Whole revolutions below 10000, thousands with a `K` suffix above.
pub fn rpm(value: f64) -> String {
    let value = clamp(value);
    if value >= 10000.0 {
        format!("{:.1}K", value / 1000.0)
    } else {
        format!("{:.0}", value)
    }
}

/// Formats a lap time given in milliseconds.
pub fn lap_time(ms: Option<f64>) -> Reading {
    let Some(ms) = ms.filter(|t| !t.is_nan() && *t != 0.0 && *t < TIME_SENTINEL_MS) else {
        return Reading::no_data();
    };

    let abs_ms = ms.abs();
    let total_seconds = abs_ms / 1000.0;
    let minutes = (total_seconds / 60.0).floor() as u64;
    let seconds = (total_seconds % 60.0).floor() as u64;
    let millis = format!("{:03}", (abs_ms % 1000.0).floor() as u64);

    if minutes > 99 {
        Reading::new("9999", Spacer::On)
    } else if total_seconds < 10.0 {
        let mut text = format!("{:.3}", total_seconds);
        while text.len() < 6 {
            text.push('0');
        }
        Reading::new(text, Spacer::Off)
    } else if minutes < 1 {
        Reading::new(format!("{:02}.{}", seconds, &millis[..2]), Spacer::Off)
    } else if minutes < 10 {
        Reading::new(
            format!("{}.{:02}.{}", minutes, seconds, &millis[..1]),
            Spacer::Off,
        )
    } else {
        Reading::new(format!("{}{:02}", minutes, seconds), Spacer::On)
    }
}

/// Formats a signed time difference given in milliseconds.
pub fn delta_time(ms: Option<f64>) -> Reading {
    let Some(ms) = ms.filter(|t| !t.is_nan() && *t < TIME_SENTINEL_MS) else {
        return Reading::no_data();
    };

    let seconds = ms.abs() / 1000.0;
    let magnitude = if seconds > 99.99 {
        "99.9".to_string()
    } else if seconds < 10.0 {
        format!("{:.2}", seconds)
    } else {
        format!("{:.1}", seconds)
    };
    let sign = if ms < 0.0 { '-' } else { '+' };

    Reading::new(format!("{}{}", sign, magnitude), Spacer::Unchanged)
}

/// Returns true when the text should be rendered as a number.
pub fn is_numeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit() || c == '.')
}

/// Splits numeric text into 4 display cells.
///
/// A `.` or `,` following a character becomes that cell's decimal point.
/// The result is left-padded with blanks and cut to the first 4 cells.
pub fn number_cells(text: &str) -> [(char, bool); 4] {
    let chars: Vec<char> = text.chars().collect();
    let mut cells = Vec::with_capacity(chars.len());

    let mut i = 0;
    while i < chars.len() {
        let dotted = matches!(chars.get(i + 1), Some('.') | Some(','));
        cells.push((chars[i], dotted));
        i += if dotted { 2 } else { 1 };
    }

    let mut padded = [(' ', false); 4];
    let pad = 4usize.saturating_sub(cells.len());
    for (slot, cell) in padded.iter_mut().skip(pad).zip(cells) {
        *slot = cell;
    }
    padded
}

/// Splits plain text into 4 display cells, left-padded with blanks.
pub fn text_cells(text: &str) -> [char; 4] {
    let chars: Vec<char> = text.chars().collect();
    let mut padded = [' '; 4];
    let pad = 4usize.saturating_sub(chars.len());
    for (slot, c) in padded.iter_mut().skip(pad).zip(chars) {
        *slot = c;
    }
    padded
}
