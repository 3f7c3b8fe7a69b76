//! Servo output stage: RC channels to PWM compare registers.

use crate::config::ServoConfig;
use crate::platform::traits::{RcLink, ServoChannel};

/// What one call to [`ServoOutputs::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoUpdate {
    /// The link just came up for the first time and the outputs were switched on.
    Enabled,
    /// Compare registers were rewritten; `skipped` channels were mid-pulse and left alone.
    Written { written: usize, skipped: usize },
}

/// A bank of `N` servo outputs fed from RC channels 1..=N.
pub struct ServoOutputs<S, const N: usize> {
    channels: [S; N],
    config: ServoConfig,
    enabled: bool,
    skipped: u32,
}

impl<S: ServoChannel, const N: usize> ServoOutputs<S, N> {
    /// Outputs stay disabled until the RC link first comes up.
    pub fn new(channels: [S; N], config: ServoConfig) -> Self {
        Self {
            channels,
            config,
            enabled: false,
            skipped: 0,
        }
    }

    /// Copies the current RC channel values to the outputs.
    ///
    /// A channel whose timer is inside its pulse keeps its old value until a later call finds
    /// the counter outside the pulse. Nothing here waits.
    pub fn update<L: RcLink>(&mut self, link: &L) -> ServoUpdate {
        if !self.enabled && link.is_link_up() {
            for channel in self.channels.iter_mut() {
                channel.enable();
            }
            self.enabled = true;
            return ServoUpdate::Enabled;
        }

        let mut written = 0;
        let mut skipped = 0;
        for index in 0..N {
            if self.set_pulse(index, link.channel(index + 1)) {
                written += 1;
            } else {
                skipped += 1;
            }
        }
        ServoUpdate::Written { written, skipped }
    }

    /// Clamps `pulse_us` and writes it to output `index` if its timer is between pulses.
    ///
    /// Returns whether the compare register was written.
    pub fn set_pulse(&mut self, index: usize, pulse_us: u16) -> bool {
        let pulse = self.clamp(pulse_us);
        let window = self.config.window;
        let Some(channel) = self.channels.get_mut(index) else {
            return false;
        };
        if !window.is_open(channel.counter()) {
            self.skipped = self.skipped.wrapping_add(1);
            return false;
        }
        channel.set_compare(pulse);
        true
    }

    pub fn clamp(&self, pulse_us: u16) -> u16 {
        pulse_us.clamp(self.config.min_pulse_us, self.config.max_pulse_us)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Writes deferred because the timer was mid-pulse.
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn channels(&self) -> &[S; N] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [S; N] {
        &mut self.channels
    }
}
