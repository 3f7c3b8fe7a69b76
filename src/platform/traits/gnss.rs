use serde::Serialize;

use super::{ByteStream, Clock};

/// Last navigation solution reported by the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GnssFix {
    /// degrees * 1e7
    pub latitude: i32,
    /// degrees * 1e7
    pub longitude: i32,
    /// height above mean sea level, millimetres
    pub altitude_msl_mm: i32,
    /// ground speed, mm/s
    pub ground_speed_mm_s: i32,
    /// heading of motion, degrees * 1e5
    pub heading: i32,
    pub satellites: u8,
}

impl GnssFix {
    pub fn is_valid(&self) -> bool {
        self.satellites > 0
    }
}

/// GNSS receiver driven over a byte stream.
pub trait Gnss {
    /// Brings the receiver up. Blocks for at most `timeout_ms`; only call before the main loop.
    fn begin<S: ByteStream, C: Clock>(&mut self, port: &mut S, clock: &C, timeout_ms: u32) -> bool;

    /// Consumes whatever the receiver has sent since the last call. Never blocks.
    fn update<S: ByteStream>(&mut self, port: &mut S, now_ms: u32);

    /// Cached solution from the last `update`.
    fn fix(&self) -> GnssFix;
}
