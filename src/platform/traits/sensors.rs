//! Analog and barometric sensor inputs.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// One barometer reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaroSample {
    /// Pressure altitude above the given QNH, metres
    pub altitude_m: f32,
    pub temperature_c: f32,
    pub pressure_pa: f32,
}

/// Barometric pressure sensor.
pub trait Barometer {
    /// Takes a reading referenced to `qnh_hpa`. `None` when the sensor did not answer.
    fn sample(&mut self, qnh_hpa: f32) -> Option<BaroSample>;
}

/// Latest oversampled ADC conversion, handed from the ADC interrupt to the main loop.
///
/// The interrupt writes the channels and then raises `ready`; the main loop only reads them
/// after seeing `ready` and lowers it once done. Each side writes one direction of the flag.
pub struct AdcReading {
    voltage: AtomicU32,
    current: AtomicU32,
    completed_at_ms: AtomicU32,
    ready: AtomicBool,
}

impl AdcReading {
    pub const fn new() -> Self {
        Self {
            voltage: AtomicU32::new(0),
            current: AtomicU32::new(0),
            completed_at_ms: AtomicU32::new(0),
            ready: AtomicBool::new(false),
        }
    }

    /// Interrupt side: a conversion sequence finished.
    ///
    /// A sample that arrives before the previous one was consumed replaces it.
    pub fn publish(&self, voltage_raw: u32, current_raw: u32, now_ms: u32) {
        self.voltage.store(voltage_raw, Ordering::Relaxed);
        self.current.store(current_raw, Ordering::Relaxed);
        self.completed_at_ms.store(now_ms, Ordering::Relaxed);
        self.ready.store(true, Ordering::Release);
    }

    /// Main loop side: takes the pending sample as `(voltage_raw, current_raw, completed_at_ms)`.
    pub fn take(&self) -> Option<(u32, u32, u32)> {
        if !self.ready.load(Ordering::Acquire) {
            return None;
        }
        let sample = (
            self.voltage.load(Ordering::Relaxed),
            self.current.load(Ordering::Relaxed),
            self.completed_at_ms.load(Ordering::Relaxed),
        );
        self.ready.store(false, Ordering::Release);
        Some(sample)
    }
}

impl Default for AdcReading {
    fn default() -> Self {
        Self::new()
    }
}
