//! Temporary messages and the ticker.
//!
//! A temporary message owns one display side until it expires. Messages
//! longer than a display scroll once, one character per step, after a short
//! pause. The ticker runs a message across both sides until stopped.

use crate::timers::{TimerKey, Timers};
use std::time::Duration;
use tmbtled_hw::Side;

/// Characters per display side.
pub const DISPLAY_WIDTH: usize = 4;

/// Pause before a long temporary message starts scrolling.
const SCROLL_DELAY: Duration = Duration::from_millis(500);

/// Period of one temporary message scroll step.
const SCROLL_STEP: Duration = Duration::from_millis(200);

/// Period of one ticker step.
const TICKER_STEP: Duration = Duration::from_millis(500);

/// Temporary message state of one side.
#[derive(Debug, Default, Clone)]
struct Slot {
    message: Option<Vec<char>>,
    cursor: usize,
}

#[derive(Debug, Clone)]
struct Ticker {
    source: Vec<char>,
    message_len: usize,
    offset: usize,
}

impl Ticker {
    fn window(&self) -> [String; 2] {
        let take = |start: usize| -> String {
            self.source
                .iter()
                .skip(start)
                .take(DISPLAY_WIDTH)
                .collect()
        };
        [take(self.offset), take(self.offset + DISPLAY_WIDTH)]
    }
}

/// Overlay state for both sides plus the ticker.
#[derive(Debug, Default)]
pub struct Overlays {
    slots: [Slot; 2],
    ticker: Option<Ticker>,
}

impl Overlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a temporary message owns the side.
    pub fn is_occupied(&self, side: Side) -> bool {
        self.slots[side.index()].message.is_some()
    }

    /// Current temporary message of a side.
    pub fn message(&self, side: Side) -> Option<String> {
        self.slots[side.index()]
            .message
            .as_ref()
            .map(|m| m.iter().collect())
    }

    /// Puts a temporary message on a side.
    ///
    /// Returns the text to show now, or `None` if the side already shows
    /// this message.
    pub fn show(
        &mut self,
        timers: &mut Timers,
        side: Side,
        message: &str,
        duration: Duration,
    ) -> Option<String> {
        let chars: Vec<char> = message.chars().collect();
        let slot = &mut self.slots[side.index()];
        if slot.message.as_ref() == Some(&chars) {
            return None;
        }

        Self::cancel_timers(timers, side);
        timers.schedule_once(TimerKey::TemporaryExpiry(side), duration);
        if chars.len() > DISPLAY_WIDTH {
            timers.schedule_once(TimerKey::ScrollDelay(side), SCROLL_DELAY);
        }

        slot.message = Some(chars);
        slot.cursor = 1;
        Some(message.chars().take(DISPLAY_WIDTH).collect())
    }

    /// Starts scrolling after the initial pause.
    pub fn start_scroll(&mut self, timers: &mut Timers, side: Side) {
        if self.is_occupied(side) {
            timers.schedule_repeating(TimerKey::Scroll(side), SCROLL_STEP);
        }
    }

    /// Advances the scroll window by one character.
    ///
    /// Returns the text to show, or `None` once the end is visible.
    pub fn scroll(&mut self, timers: &mut Timers, side: Side) -> Option<String> {
        let slot = &mut self.slots[side.index()];
        let Some(message) = slot.message.as_ref() else {
            timers.cancel(TimerKey::Scroll(side));
            return None;
        };

        if slot.cursor + (DISPLAY_WIDTH - 1) >= message.len() {
            timers.cancel(TimerKey::Scroll(side));
            return None;
        }

        let text = message.iter().skip(slot.cursor).collect();
        slot.cursor += 1;
        Some(text)
    }

    /// Clears a side's temporary message.
    pub fn expire(&mut self, timers: &mut Timers, side: Side) {
        Self::cancel_timers(timers, side);
        self.slots[side.index()] = Slot::default();
    }

    fn cancel_timers(timers: &mut Timers, side: Side) {
        timers.cancel(TimerKey::TemporaryExpiry(side));
        timers.cancel(TimerKey::ScrollDelay(side));
        timers.cancel(TimerKey::Scroll(side));
    }

    /// Starts the ticker and returns the left and right text to show.
    pub fn start_ticker(&mut self, timers: &mut Timers, message: &str) -> [String; 2] {
        self.stop_ticker(timers);

        let message_len = message.chars().count();
        let ticker = Ticker {
            source: format!("{} {}", message, message).chars().collect(),
            message_len,
            offset: 0,
        };
        let window = ticker.window();

        if message_len > 2 * DISPLAY_WIDTH {
            timers.schedule_repeating(TimerKey::Ticker, TICKER_STEP);
        }
        self.ticker = Some(ticker);
        window
    }

    /// Advances the ticker, wrapping after one full pass.
    pub fn tick(&mut self) -> Option<[String; 2]> {
        let ticker = self.ticker.as_mut()?;
        ticker.offset = if ticker.offset >= ticker.message_len {
            0
        } else {
            ticker.offset + 1
        };
        Some(ticker.window())
    }

    pub fn is_ticker_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn stop_ticker(&mut self, timers: &mut Timers) {
        timers.cancel(TimerKey::Ticker);
        self.ticker = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DURATION: Duration = Duration::from_millis(3000);

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_message_keeps_one_expiry() {
        let mut timers = Timers::new();
        let mut overlays = Overlays::new();

        for _ in 0..2 {
            overlays.show(&mut timers, Side::Left, "RACE", DURATION);
            overlays.show(&mut timers, Side::Right, "ROOM", DURATION);
        }

        assert!(timers.is_active(TimerKey::TemporaryExpiry(Side::Left)));
        assert!(timers.is_active(TimerKey::TemporaryExpiry(Side::Right)));
        assert_eq!(timers.len(), 2);
        assert_eq!(timers.created(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_returns_first_window() {
        let mut timers = Timers::new();
        let mut overlays = Overlays::new();

        let text = overlays.show(&mut timers, Side::Left, "FUEL", DURATION);
        assert_eq!(text.as_deref(), Some("FUEL"));
        assert!(!timers.is_active(TimerKey::ScrollDelay(Side::Left)));

        let text = overlays.show(&mut timers, Side::Right, "POSITION", DURATION);
        assert_eq!(text.as_deref(), Some("POSI"));
        assert!(timers.is_active(TimerKey::ScrollDelay(Side::Right)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_message_replaces_and_resets() {
        let mut timers = Timers::new();
        let mut overlays = Overlays::new();

        overlays.show(&mut timers, Side::Left, "LAPTIME", DURATION);
        overlays.start_scroll(&mut timers, Side::Left);
        overlays.scroll(&mut timers, Side::Left);

        let text = overlays.show(&mut timers, Side::Left, "GEAR", DURATION);
        assert_eq!(text.as_deref(), Some("GEAR"));
        assert_eq!(overlays.message(Side::Left).as_deref(), Some("GEAR"));
        assert!(!timers.is_active(TimerKey::Scroll(Side::Left)));
        assert!(!timers.is_active(TimerKey::ScrollDelay(Side::Left)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_stops_at_end() {
        let mut timers = Timers::new();
        let mut overlays = Overlays::new();

        overlays.show(&mut timers, Side::Left, "ABCDEF", DURATION);
        overlays.start_scroll(&mut timers, Side::Left);
        assert_eq!(overlays.scroll(&mut timers, Side::Left).as_deref(), Some("BCDEF"));
        assert_eq!(overlays.scroll(&mut timers, Side::Left).as_deref(), Some("CDEF"));
        assert_eq!(overlays.scroll(&mut timers, Side::Left), None);
        assert!(!timers.is_active(TimerKey::Scroll(Side::Left)));
        assert!(overlays.is_occupied(Side::Left));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_frees_side() {
        let mut timers = Timers::new();
        let mut overlays = Overlays::new();

        overlays.show(&mut timers, Side::Right, "PITLANE", DURATION);
        overlays.expire(&mut timers, Side::Right);
        assert!(!overlays.is_occupied(Side::Right));
        assert_eq!(timers.len(), 0);

        // The same text may be shown again once expired
        assert!(overlays
            .show(&mut timers, Side::Right, "PITLANE", DURATION)
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_ticker_does_not_scroll() {
        let mut timers = Timers::new();
        let mut overlays = Overlays::new();

        let window = overlays.start_ticker(&mut timers, "HELLO");
        assert_eq!(window, ["HELL".to_string(), "O HE".to_string()]);
        assert!(!timers.is_active(TimerKey::Ticker));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_wraps() {
        let mut timers = Timers::new();
        let mut overlays = Overlays::new();

        let message = "ABCDEFGHIJ";
        let window = overlays.start_ticker(&mut timers, message);
        assert_eq!(window, ["ABCD".to_string(), "EFGH".to_string()]);
        assert!(timers.is_active(TimerKey::Ticker));

        assert_eq!(
            overlays.tick(),
            Some(["BCDE".to_string(), "FGHI".to_string()])
        );
        for _ in 1..message.len() {
            overlays.tick();
        }
        assert_eq!(
            overlays.tick(),
            Some(["ABCD".to_string(), "EFGH".to_string()])
        );

        overlays.stop_ticker(&mut timers);
        assert!(!timers.is_active(TimerKey::Ticker));
        assert_eq!(overlays.tick(), None);
    }
}
