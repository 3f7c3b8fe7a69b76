//! Debug console reports, serialized as one JSON object per line.

use serde::Serialize;

use crate::platform::traits::GnssFix;

/// Periodic health line.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    /// main loop iterations since boot
    pub loops: u32,
    pub link_up: bool,
    pub ch1: u16,
    pub ch2: u16,
    /// RC receive path restarts
    pub restarts: u32,
    /// ADC conversion interval, ms
    pub adc_period: u32,
    pub rx_overruns: u32,
    pub rx_dropped: u32,
    pub battery_v: f32,
    pub altitude_m: f32,
}

/// GNSS state, sent less often than the health line.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct GnssReport {
    pub ready: bool,
    pub fix: bool,
    pub solution: GnssFix,
}

/// Boot-time bring-up outcome.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    pub gnss: bool,
}
