//! Mock UART for driving a serial engine without hardware.

use core::cell::{Cell, RefCell};

use heapless::Vec;

use crate::platform::traits::UartHardware;
use crate::platform::HardwareError;

/// Bytes the mock remembers across all transmits.
pub const MOCK_TX_LOG: usize = 2048;

/// In-memory UART.
///
/// Every started transmit is appended to a log. Transfers never complete on their own: the
/// test calls `IrqPort::on_transmit_complete` to play the interrupt.
///
/// ```
/// use crsf_pwm_firmware::platform::mock::MockUart;
/// use crsf_pwm_firmware::serial::Engine;
///
/// let engine: Engine<MockUart, 16, 16, 4> = Engine::new(MockUart::new());
/// let (mut port, mut irq) = engine.split().unwrap();
/// port.init();
/// port.write(b"hello").unwrap();
/// irq.on_transmit_complete();
/// assert_eq!(&engine.hardware().transmitted()[..], b"hello");
/// ```
#[derive(Debug, Default)]
pub struct MockUart {
    log: RefCell<Vec<u8, MOCK_TX_LOG>>,
    last_chunk: Cell<usize>,
    transmits: Cell<u32>,
    refuse_next: Cell<u32>,
    tx_aborts: Cell<u32>,
    rx_arms: Cell<u32>,
    rx_aborts: Cell<u32>,
    rx_armed: Cell<bool>,
    refuse_receive: Cell<bool>,
}

impl MockUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every byte handed to `start_transmit`, in order.
    pub fn transmitted(&self) -> Vec<u8, MOCK_TX_LOG> {
        self.log.borrow().clone()
    }

    /// Size of the most recent transfer started.
    pub fn last_chunk(&self) -> usize {
        self.last_chunk.get()
    }

    /// Number of transfers started.
    pub fn transmit_count(&self) -> u32 {
        self.transmits.get()
    }

    /// Makes the next `count` transmit requests fail with `HardwareError::Busy`.
    pub fn refuse_transmits(&self, count: u32) {
        self.refuse_next.set(count);
    }

    pub fn refuse_receive(&self, refuse: bool) {
        self.refuse_receive.set(refuse);
    }

    pub fn transmit_aborts(&self) -> u32 {
        self.tx_aborts.get()
    }

    /// Number of `start_receive` calls, successful or not.
    pub fn receive_arms(&self) -> u32 {
        self.rx_arms.get()
    }

    pub fn receive_aborts(&self) -> u32 {
        self.rx_aborts.get()
    }

    pub fn receive_armed(&self) -> bool {
        self.rx_armed.get()
    }
}

impl UartHardware for MockUart {
    fn start_transmit(&self, chunk: &[u8]) -> Result<(), HardwareError> {
        if self.refuse_next.get() > 0 {
            self.refuse_next.set(self.refuse_next.get() - 1);
            return Err(HardwareError::Busy);
        }
        // the log is a test aid; bytes past its capacity are simply not recorded
        let _ = self.log.borrow_mut().extend_from_slice(chunk);
        self.last_chunk.set(chunk.len());
        self.transmits.set(self.transmits.get() + 1);
        Ok(())
    }

    fn abort_transmit(&self) {
        self.tx_aborts.set(self.tx_aborts.get() + 1);
    }

    fn start_receive(&self) -> Result<(), HardwareError> {
        self.rx_arms.set(self.rx_arms.get() + 1);
        if self.refuse_receive.get() {
            return Err(HardwareError::Fault);
        }
        self.rx_armed.set(true);
        Ok(())
    }

    fn abort_receive(&self) {
        self.rx_armed.set(false);
        self.rx_aborts.set(self.rx_aborts.get() + 1);
    }
}
