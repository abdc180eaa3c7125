//! Keyed timer scheduler for flashing and display overlays.
//!
//! Every timer has a logical key and at most one timer exists per key.
//! The driver loop sleeps until [`Timers::next_deadline`] and then drains
//! [`Timers::pop_due`].

use crate::indicators::Indicator;
use std::collections::HashMap;
use std::time::Duration;
use tmbtled_hw::Side;
use tokio::time::Instant;

/// Logical purpose of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Periodic toggle of an indicator.
    Flash(Indicator),
    /// End of a temporary message.
    TemporaryExpiry(Side),
    /// Delay before a long temporary message starts scrolling.
    ScrollDelay(Side),
    /// Scroll step of a temporary message.
    Scroll(Side),
    /// Ticker step.
    Ticker,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    deadline: Instant,
    period: Option<Duration>,
}

/// Timer table with cancellation accounting.
#[derive(Debug, Default)]
pub struct Timers {
    entries: HashMap<TimerKey, Entry>,
    created: u64,
    cancelled: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, key: TimerKey, entry: Entry) {
        self.cancel(key);
        self.entries.insert(key, entry);
        self.created += 1;
    }

    /// Schedules a one-shot timer, replacing any timer with the same key.
    pub fn schedule_once(&mut self, key: TimerKey, delay: Duration) {
        self.insert(
            key,
            Entry {
                deadline: Instant::now() + delay,
                period: None,
            },
        );
    }

    /// Schedules a repeating timer, replacing any timer with the same key.
    pub fn schedule_repeating(&mut self, key: TimerKey, period: Duration) {
        self.insert(
            key,
            Entry {
                deadline: Instant::now() + period,
                period: Some(period),
            },
        );
    }

    /// Cancels a timer. Returns true if one was active.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        let removed = self.entries.remove(&key).is_some();
        if removed {
            self.cancelled += 1;
        }
        removed
    }

    pub fn is_active(&self, key: TimerKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Number of active timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|e| e.deadline).min()
    }

    /// Removes and returns the earliest timer due at `now`.
    ///
    /// Repeating timers are re-armed one period later instead of removed.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKey> {
        let (key, entry) = self
            .entries
            .iter()
            .filter(|(_, e)| e.deadline <= now)
            .min_by_key(|(_, e)| e.deadline)
            .map(|(k, e)| (*k, *e))?;

        match entry.period {
            Some(period) => {
                if let Some(e) = self.entries.get_mut(&key) {
                    e.deadline += period;
                }
            }
            None => {
                self.entries.remove(&key);
            }
        }
        Some(key)
    }

    /// Total timers ever scheduled.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Total timers cancelled before firing out.
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}
