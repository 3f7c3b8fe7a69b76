use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use serde::Serialize;

use super::{IrqPort, Port};
use crate::datamodel::error::Error;
use crate::fifo::Ring;
use crate::platform::traits::UartHardware;
use crate::platform::HardwareError;

/// Diagnostic counters for one engine. They only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// received bytes pushed out of a full RX ring
    pub rx_dropped: u32,
    /// receive completions flagged with a hardware overrun
    pub rx_overruns: u32,
    /// receive completions flagged with framing, noise or parity errors
    pub rx_line_errors: u32,
    /// bytes handed to the hardware
    pub tx_bytes: u32,
    /// transfers the hardware refused
    pub tx_refused: u32,
    pub flush_timeouts: u32,
}

struct Counters {
    rx_dropped: AtomicU32,
    rx_overruns: AtomicU32,
    rx_line_errors: AtomicU32,
    tx_bytes: AtomicU32,
    tx_refused: AtomicU32,
    flush_timeouts: AtomicU32,
}

impl Counters {
    const fn new() -> Self {
        Self {
            rx_dropped: AtomicU32::new(0),
            rx_overruns: AtomicU32::new(0),
            rx_line_errors: AtomicU32::new(0),
            tx_bytes: AtomicU32::new(0),
            tx_refused: AtomicU32::new(0),
            flush_timeouts: AtomicU32::new(0),
        }
    }
}

/// Every counter has a single writer at a time, so a plain load/store is enough.
fn bump(counter: &AtomicU32, by: u32) {
    let value = counter.load(Ordering::Relaxed);
    counter.store(value.wrapping_add(by), Ordering::Relaxed);
}

/// Duplex FIFO transport for one UART.
///
/// `RX` and `TX` are ring capacities (powers of two), `CHUNK` the most bytes handed to the
/// hardware in one transmit. Meant to live in a `static` and be split exactly once.
pub struct Engine<H, const RX: usize, const TX: usize, const CHUNK: usize> {
    hw: H,
    pub(super) rx: Ring<RX>,
    pub(super) tx: Ring<TX>,
    /// TX handshake: true while no transmit is in flight
    tx_ready: AtomicBool,
    /// RX handshake: true while no receive is armed
    rx_ready: AtomicBool,
    initialized: AtomicBool,
    split: AtomicBool,
    counters: Counters,
}

impl<H, const RX: usize, const TX: usize, const CHUNK: usize> Engine<H, RX, TX, CHUNK>
where
    H: UartHardware,
{
    pub const fn new(hw: H) -> Self {
        Self {
            hw,
            rx: Ring::new(),
            tx: Ring::new(),
            tx_ready: AtomicBool::new(true),
            rx_ready: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
            split: AtomicBool::new(false),
            counters: Counters::new(),
        }
    }

    /// Hands out the main-loop and interrupt halves. Only the first call succeeds.
    pub fn split(&self) -> Option<(Port<'_, H, RX, TX, CHUNK>, IrqPort<'_, H, RX, TX, CHUNK>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((
            Port::new(self, self.rx.consumer(), self.tx.producer()),
            IrqPort::new(self, self.rx.producer()),
        ))
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_idle_tx(&self) -> bool {
        self.tx_ready.load(Ordering::Acquire)
    }

    pub fn is_idle_rx(&self) -> bool {
        self.rx_ready.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> EngineStats {
        let c = &self.counters;
        EngineStats {
            rx_dropped: c.rx_dropped.load(Ordering::Relaxed),
            rx_overruns: c.rx_overruns.load(Ordering::Relaxed),
            rx_line_errors: c.rx_line_errors.load(Ordering::Relaxed),
            tx_bytes: c.tx_bytes.load(Ordering::Relaxed),
            tx_refused: c.tx_refused.load(Ordering::Relaxed),
            flush_timeouts: c.flush_timeouts.load(Ordering::Relaxed),
        }
    }

    pub(super) fn set_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// Claims the TX token if no transmit is in flight.
    pub(super) fn try_claim_tx(&self) -> bool {
        if !self.tx_ready.load(Ordering::Acquire) {
            return false;
        }
        // nothing completes while idle, so no other context can race this store
        self.tx_ready.store(false, Ordering::Release);
        true
    }

    pub(super) fn release_tx(&self) {
        self.tx_ready.store(true, Ordering::Release);
    }

    /// Pulls the next chunk and starts sending it. Caller must hold the TX token.
    ///
    /// The token is released when the ring is empty or the hardware refuses. A refused chunk
    /// goes back to the front of the ring before the token is released.
    pub(super) fn issue_next(&self) -> Result<(), Error> {
        let mut scratch = [0u8; CHUNK];
        let count = self.tx.take_into(&mut scratch);
        if count == 0 {
            self.release_tx();
            return Ok(());
        }
        match self.hw.start_transmit(&scratch[..count]) {
            Ok(()) => {
                bump(&self.counters.tx_bytes, count as u32);
                Ok(())
            }
            Err(_) => {
                self.tx.restore_front(&scratch[..count]);
                bump(&self.counters.tx_refused, 1);
                self.release_tx();
                Err(Error::HardwareBusy)
            }
        }
    }

    /// Arms receive twice; some UARTs ignore the first request after an abort or reset.
    pub(super) fn arm_receive(&self) -> Result<(), HardwareError> {
        let first = self.hw.start_receive();
        let second = self.hw.start_receive();
        first.or(second)?;
        self.rx_ready.store(false, Ordering::Release);
        Ok(())
    }

    pub(super) fn disarm_receive(&self) {
        self.hw.abort_receive();
        self.rx_ready.store(true, Ordering::Release);
    }

    /// Kills an in-flight transmit and takes the token back.
    pub(super) fn abort_tx(&self) {
        self.hw.abort_transmit();
        self.release_tx();
    }

    /// Receive completion bookkeeping. Interrupt context only.
    pub(super) fn receive_done(&self, overrun: bool, line_error: bool, dropped: u32) {
        if overrun {
            bump(&self.counters.rx_overruns, 1);
        }
        if line_error {
            bump(&self.counters.rx_line_errors, 1);
        }
        if dropped > 0 {
            bump(&self.counters.rx_dropped, dropped);
        }
        self.rx_ready.store(true, Ordering::Release);
        if self.hw.start_receive().is_ok() {
            self.rx_ready.store(false, Ordering::Release);
        }
    }

    pub(super) fn note_flush_timeout(&self) {
        bump(&self.counters.flush_timeouts, 1);
    }
}
