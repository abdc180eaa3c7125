//! Display mode cycling driven by the wheel buttons.

use tmbtled_hw::Direction;
use tracing::warn;

/// Ordered list of display modes for one side.
#[derive(Debug, Clone, Default)]
pub struct ModeCycle {
    modes: Vec<String>,
    current: usize,
}

impl ModeCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the mode list and returns to the first mode.
    pub fn set_modes(&mut self, modes: Vec<String>) {
        self.modes = modes;
        self.current = 0;
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_name(&self) -> Option<&str> {
        self.modes.get(self.current).map(String::as_str)
    }

    /// Steps in a direction with wraparound. Returns `None` when no modes
    /// are defined.
    pub fn step(&mut self, direction: Direction) -> Option<usize> {
        let len = self.modes.len();
        if len == 0 {
            warn!("No modes defined");
            return None;
        }

        self.current = match direction {
            Direction::Next => (self.current + 1) % len,
            Direction::Previous => (self.current + len - 1) % len,
        };
        Some(self.current)
    }
}
