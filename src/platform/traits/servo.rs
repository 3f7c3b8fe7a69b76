/// One PWM servo output on a free-running 1 MHz timer.
pub trait ServoChannel {
    /// Current timer counter, in microseconds into the frame.
    fn counter(&self) -> u16;

    /// Pulse width currently programmed, microseconds.
    fn compare(&self) -> u16;

    fn set_compare(&mut self, pulse_us: u16);

    /// Starts driving the output pin.
    fn enable(&mut self);

    fn is_enabled(&self) -> bool;
}
