//! Device protocol definitions.
//!
//! The cluster exposes a HID-over-GATT service. Frames are written to a
//! report characteristic without response; button state arrives as
//! notifications on another report characteristic:
//! - byte 0: reserved
//! - byte 1: left button counter (wrapping 0-255)
//! - byte 2: right button counter (wrapping 0-255)

use crate::{Error, Result};

/// HID service short UUID.
pub const HID_SERVICE_UUID: u16 = 0x1812;

/// HID report characteristic short UUID.
pub const HID_REPORT_UUID: u16 = 0x2A4D;

/// ATT handle of the frame report on known devices.
pub const STATE_HANDLE: u16 = 58;

/// Minimum button report length.
pub const BUTTON_REPORT_SIZE: usize = 3;

/// Display side of the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// Array index of the side.
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Direction of a mode button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// A decoded button report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonReport {
    pub left: u8,
    pub right: u8,
}

impl ButtonReport {
    /// Parses a raw notification payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BUTTON_REPORT_SIZE {
            return Err(Error::ShortReport(data.len()));
        }
        Ok(Self {
            left: data[1],
            right: data[2],
        })
    }

    fn counter(&self, side: Side) -> u8 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// A detected change of a button counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEdge {
    pub side: Side,
    pub direction: Direction,
}

/// Turns successive button reports into edge events.
#[derive(Debug, Clone, Default)]
pub struct ButtonTracker {
    current: [Option<u8>; 2],
}

impl ButtonTracker {
    /// Creates a tracker that has not seen any report yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a report and returns the edges it produced, left side first.
    ///
    /// The first report only initialises the counters. A counter that moved
    /// by exactly one (modulo 256) is a "next" press, any other change a
    /// "previous" press.
    pub fn update(&mut self, report: ButtonReport) -> Vec<ButtonEdge> {
        let mut edges = Vec::new();

        for side in Side::BOTH {
            let value = report.counter(side);
            let slot = &mut self.current[side.index()];
            match *slot {
                None => *slot = Some(value),
                Some(old) if old == value => {}
                Some(old) => {
                    let direction = if old.wrapping_add(1) == value {
                        Direction::Next
                    } else {
                        Direction::Previous
                    };
                    edges.push(ButtonEdge { side, direction });
                    *slot = Some(value);
                }
            }
        }

        edges
    }

    /// Forgets the last seen counters.
    pub fn reset(&mut self) {
        self.current = [None; 2];
    }
}

/// Connection parameters requested from the peer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionParameters {
    /// Minimum connection interval in milliseconds.
    pub min_interval_ms: f64,
    /// Maximum connection interval in milliseconds.
    pub max_interval_ms: f64,
    /// Peripheral latency in connection events.
    pub latency: u16,
    /// Supervision timeout in milliseconds.
    pub supervision_timeout_ms: u16,
}

impl ConnectionParameters {
    /// Short interval for live telemetry.
    pub fn performance(target_interval_ms: f64) -> Self {
        Self {
            min_interval_ms: target_interval_ms,
            max_interval_ms: target_interval_ms,
            latency: 0,
            supervision_timeout_ms: 3000,
        }
    }

    /// Long interval while nothing is happening.
    pub fn power_save() -> Self {
        Self {
            min_interval_ms: 125.0,
            max_interval_ms: 250.0,
            latency: 0,
            supervision_timeout_ms: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(tracker: &mut ButtonTracker, left: &[u8]) -> Vec<ButtonEdge> {
        left.iter()
            .flat_map(|&value| tracker.update(ButtonReport { left: value, right: 0 }))
            .collect()
    }

    #[test]
    fn test_report_parse() {
        let report = ButtonReport::parse(&[0x00, 0x0A, 0xFF]).unwrap();
        assert_eq!(report.left, 10);
        assert_eq!(report.right, 255);
        assert!(ButtonReport::parse(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn test_first_report_initialises() {
        let mut tracker = ButtonTracker::new();
        assert!(feed(&mut tracker, &[42]).is_empty());
    }

    #[test]
    fn test_increments_are_next() {
        let mut tracker = ButtonTracker::new();
        let edges = feed(&mut tracker, &[10, 11, 12]);
        assert_eq!(edges.len(), 2);
        assert!(edges
            .iter()
            .all(|e| e.side == Side::Left && e.direction == Direction::Next));
    }

    #[test]
    fn test_decrement_is_previous() {
        let mut tracker = ButtonTracker::new();
        let edges = feed(&mut tracker, &[10, 9]);
        assert_eq!(
            edges,
            vec![ButtonEdge {
                side: Side::Left,
                direction: Direction::Previous
            }]
        );
    }

    #[test]
    fn test_wraparound_is_next() {
        let mut tracker = ButtonTracker::new();
        let edges = feed(&mut tracker, &[255, 0]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].direction, Direction::Next);
    }

    #[test]
    fn test_unchanged_counter_is_silent() {
        let mut tracker = ButtonTracker::new();
        assert!(feed(&mut tracker, &[7, 7, 7]).is_empty());
    }

    #[test]
    fn test_sides_are_independent() {
        let mut tracker = ButtonTracker::new();
        tracker.update(ButtonReport { left: 1, right: 200 });
        let edges = tracker.update(ButtonReport { left: 1, right: 198 });
        assert_eq!(
            edges,
            vec![ButtonEdge {
                side: Side::Right,
                direction: Direction::Previous
            }]
        );
    }

    #[test]
    fn test_reset_reinitialises() {
        let mut tracker = ButtonTracker::new();
        feed(&mut tracker, &[3]);
        tracker.reset();
        assert!(feed(&mut tracker, &[9]).is_empty());
    }

    #[test]
    fn test_profiles() {
        let perf = ConnectionParameters::performance(17.5);
        assert_eq!(perf.min_interval_ms, 17.5);
        assert_eq!(perf.max_interval_ms, 17.5);

        let save = ConnectionParameters::power_save();
        assert_eq!(save.min_interval_ms, 125.0);
        assert_eq!(save.max_interval_ms, 250.0);
        assert_eq!(save.supervision_timeout_ms, 3000);
    }
}
