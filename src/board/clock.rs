//! Millisecond clock on top of the RTIC monotonic.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use crsf_pwm_firmware::platform::traits::Clock;

use super::SYSCLK_HZ;

const TICKS_PER_MS: u64 = (SYSCLK_HZ / 1000) as u64;

/// Last value handed out by [`MonoClock`], for interrupt handlers.
static MILLIS: AtomicU32 = AtomicU32::new(0);

/// Milliseconds as last seen by the main loop.
pub fn millis() -> u32 {
    MILLIS.load(Ordering::Relaxed)
}

/// Extends the 32-bit cycle counter, which wraps in under a minute, into a millisecond count.
///
/// Must be read at least once per counter wrap; the main loop reads it every iteration.
pub struct MonoClock {
    last_ticks: Cell<u32>,
    leftover_ticks: Cell<u64>,
    millis: Cell<u32>,
}

impl MonoClock {
    /// The cycle counter starts from zero when the monotonic is created.
    pub const fn new() -> Self {
        Self {
            last_ticks: Cell::new(0),
            leftover_ticks: Cell::new(0),
            millis: Cell::new(0),
        }
    }
}

impl Default for MonoClock {
    fn default() -> Self {
        Self::new()
    }
}

fn ticks() -> u32 {
    *crate::app::monotonics::now()
        .duration_since_epoch()
        .integer()
}

impl Clock for MonoClock {
    fn now_ms(&self) -> u32 {
        let now = ticks();
        let elapsed = now.wrapping_sub(self.last_ticks.get()) as u64 + self.leftover_ticks.get();
        self.last_ticks.set(now);
        self.leftover_ticks.set(elapsed % TICKS_PER_MS);

        let millis = self.millis.get().wrapping_add((elapsed / TICKS_PER_MS) as u32);
        self.millis.set(millis);
        MILLIS.store(millis, Ordering::Relaxed);
        millis
    }
}
