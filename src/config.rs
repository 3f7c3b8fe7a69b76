//! Compile-time configuration.
//!
//! Buffer sizes are per UART role. Ring capacities must be powers of two; one slot of each
//! ring is kept free, so a 256 byte ring holds 255 bytes.

/* UART roles */

/// Debug console (USART2) RX ring capacity
pub const DEBUG_RX_CAPACITY: usize = 256;
/// Debug console (USART2) TX ring capacity
pub const DEBUG_TX_CAPACITY: usize = 256;
/// Largest single debug transmit
pub const DEBUG_TX_CHUNK: usize = 16;

/// GNSS (USART3) RX ring capacity
pub const GNSS_RX_CAPACITY: usize = 512;
/// GNSS (USART3) TX ring capacity
pub const GNSS_TX_CAPACITY: usize = 512;
/// Largest single GNSS transmit
pub const GNSS_TX_CHUNK: usize = 8;

/// RC link (USART1) RX ring capacity
pub const CRSF_RX_CAPACITY: usize = 256;
/// RC link (USART1) TX ring capacity
pub const CRSF_TX_CAPACITY: usize = 256;
/// Largest single RC link transmit, one full CRSF frame
pub const CRSF_TX_CHUNK: usize = 64;

pub const CRSF_BAUD: u32 = 420_000;
pub const DEBUG_BAUD: u32 = 115_200;
pub const GNSS_BAUD: u32 = 38_400;

/* scheduler periods, milliseconds. 0 runs every tick */

pub const RC_INTAKE_PERIOD_MS: u32 = 0;
pub const LINK_WATCHDOG_PERIOD_MS: u32 = 0;
pub const SERVO_UPDATE_PERIOD_MS: u32 = 1;
pub const BATTERY_PERIOD_MS: u32 = 0;
pub const GNSS_UPDATE_PERIOD_MS: u32 = 100;
pub const ALTITUDE_PERIOD_MS: u32 = 125;
pub const DEBUG_REPORT_PERIOD_MS: u32 = 200;
pub const GNSS_REPORT_PERIOD_MS: u32 = 2000;
/// Telemetry frame rate with four carousel slots: every value goes out every 500 ms.
pub const TELEMETRY_PERIOD_MS: u32 = 500 / TELEMETRY_SLOTS as u32;
pub const TELEMETRY_SLOTS: usize = 4;
pub const SERIAL_RETRY_PERIOD_MS: u32 = 0;

/* link supervision */

/// Continuous link-down time before the RC receive path is restarted.
pub const LINK_STALL_THRESHOLD_MS: u32 = 10;
/// The decoder reports the link down after this long without a channels frame.
pub const CRSF_FAILSAFE_MS: u32 = 300;

/* bring-up */

pub const GNSS_BEGIN_TIMEOUT_MS: u32 = 1000;
/// Navigation solution rate requested from the GNSS module at bring-up.
pub const GNSS_MEASUREMENT_PERIOD_MS: u16 = 500;
pub const BOOT_FLUSH_TIMEOUT_MS: u32 = 50;

/* servo outputs */

pub const SERVO_CHANNELS: usize = 10;

/// Pulse width limits and the timer window in which compare registers may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoConfig {
    /// Shortest pulse ever commanded, microseconds
    pub min_pulse_us: u16,
    /// Longest pulse ever commanded, microseconds
    pub max_pulse_us: u16,
    pub window: UpdateWindow,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            min_pulse_us: 750,
            max_pulse_us: 2250,
            window: UpdateWindow::default(),
        }
    }
}

/// Counter range, in timer ticks, where rewriting the compare register cannot clip a pulse.
///
/// The servo timers run at 1 MHz with a 20 ms frame. Below `open_from` a pulse may still be
/// high; past `open_until` the next frame is about to begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateWindow {
    pub open_from: u16,
    pub open_until: u16,
}

impl UpdateWindow {
    /// true when a compare write at `counter` lands between pulses
    pub const fn is_open(&self, counter: u16) -> bool {
        counter >= self.open_from && counter <= self.open_until
    }
}

impl Default for UpdateWindow {
    fn default() -> Self {
        Self {
            open_from: 2250,
            open_until: 19950,
        }
    }
}

/* sensors */

/// IIR smoothing factor for the battery ADC channels
pub const BATTERY_FILTER_ALPHA: f32 = 0.239_057;
/// Conversions summed into every published ADC result.
pub const ADC_OVERSAMPLING: u32 = 16;
/// IIR smoothing factor for altitude and vertical speed
pub const ALTITUDE_FILTER_ALPHA: f32 = 0.135_755;
/// Barometer samples averaged into the ground reference before filtering starts
pub const GROUND_SAMPLES: u32 = 1000;
/// Standard sea level pressure, hPa
pub const QNH_HPA: f32 = 1013.25;
