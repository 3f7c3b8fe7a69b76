use core::cell::Cell;

use crate::platform::traits::Clock;

/// Manually driven millisecond clock.
///
/// With a non-zero step every `now_ms` call moves time forward, which lets busy-wait loops
/// time out without a real timer behind them.
#[derive(Debug, Default)]
pub struct MockClock {
    now: Cell<u32>,
    step: Cell<u32>,
}

impl MockClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Cell::new(start_ms),
            step: Cell::new(0),
        }
    }

    /// A clock that advances `step_ms` after every reading.
    pub fn ticking(start_ms: u32, step_ms: u32) -> Self {
        Self {
            now: Cell::new(start_ms),
            step: Cell::new(step_ms),
        }
    }

    pub fn set(&self, now_ms: u32) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step.get()));
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticking_clock_advances_per_read() {
        let clock = MockClock::ticking(10, 2);
        assert_eq!(clock.now_ms(), 10);
        assert_eq!(clock.now_ms(), 12);
        clock.advance(100);
        assert_eq!(clock.now_ms(), 114);
    }

    #[test]
    fn test_clock_wraps() {
        let clock = MockClock::new(u32::MAX);
        clock.advance(2);
        assert_eq!(clock.now_ms(), 1);
    }
}
