use crate::platform::traits::ServoChannel;

/// In-memory PWM channel with a settable timer counter.
#[derive(Debug, Default, Clone)]
pub struct MockServo {
    counter: u16,
    compare: u16,
    enabled: bool,
    writes: u32,
}

impl MockServo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places the free-running counter at `ticks` into the frame.
    pub fn set_counter(&mut self, ticks: u16) {
        self.counter = ticks;
    }

    /// Compare register writes so far.
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl ServoChannel for MockServo {
    fn counter(&self) -> u16 {
        self.counter
    }

    fn compare(&self) -> u16 {
        self.compare
    }

    fn set_compare(&mut self, pulse_us: u16) {
        self.compare = pulse_us;
        self.writes += 1;
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
