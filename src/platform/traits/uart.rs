//! Interrupt-driven UART primitives consumed by the serial engine.

use crate::platform::HardwareError;

/// Error flags latched by the UART alongside a receive completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxFlags {
    pub overrun: bool,
    pub framing: bool,
    pub noise: bool,
    pub parity: bool,
}

impl RxFlags {
    pub const NONE: RxFlags = RxFlags {
        overrun: false,
        framing: false,
        noise: false,
        parity: false,
    };

    pub fn any(&self) -> bool {
        self.overrun || self.framing || self.noise || self.parity
    }
}

/// Non-blocking transfer control for one UART.
///
/// Completions come back through the engine's interrupt half:
/// - every byte received calls `on_receive_complete`, as does a receive error, with an empty chunk
/// - the end of every transmit calls `on_transmit_complete`
///
/// Methods take `&self` because the same peripheral is driven from the main loop and from its
/// interrupt handler. The engine guarantees only one context starts a transmit at a time.
pub trait UartHardware {
    /// Starts sending `chunk`.
    ///
    /// The implementation takes its own copy, so `chunk` may be reused once this returns.
    fn start_transmit(&self, chunk: &[u8]) -> Result<(), HardwareError>;

    /// Stops a transmit in progress. No completion follows.
    fn abort_transmit(&self);

    /// Arms the next receive completion.
    fn start_receive(&self) -> Result<(), HardwareError>;

    /// Disarms receive. No completion follows until the next `start_receive`.
    fn abort_receive(&self);
}
