/// Millisecond tick source.
pub trait Clock {
    /// Milliseconds since boot. Wraps at `u32::MAX`; compare with `wrapping_sub`.
    fn now_ms(&self) -> u32;
}
