use core::fmt;

use super::engine::Engine;
use super::{EngineStats, SerialPort};
use crate::datamodel::error::Error;
use crate::fifo::{Consumer, Producer};
use crate::platform::traits::{ByteStream, Clock, RxFlags, UartHardware};

/// Main-loop half of an [`Engine`]: reads the RX ring, fills the TX ring.
pub struct Port<'a, H, const RX: usize, const TX: usize, const CHUNK: usize> {
    engine: &'a Engine<H, RX, TX, CHUNK>,
    rx: Consumer<'a, RX>,
    tx: Producer<'a, TX>,
}

impl<'a, H, const RX: usize, const TX: usize, const CHUNK: usize> Port<'a, H, RX, TX, CHUNK>
where
    H: UartHardware,
{
    pub(super) fn new(
        engine: &'a Engine<H, RX, TX, CHUNK>,
        rx: Consumer<'a, RX>,
        tx: Producer<'a, TX>,
    ) -> Self {
        Self { engine, rx, tx }
    }

    /// Empties both rings, marks TX idle and arms receive.
    ///
    /// Any transfer still running from before is aborted first so no completion lands
    /// mid-reset.
    pub fn init(&mut self) {
        self.engine.abort_tx();
        self.engine.disarm_receive();
        self.rx.clear();
        self.tx.clear();
        self.engine.set_initialized();
        if let Err(e) = self.engine.arm_receive() {
            log_warn!("serial init: receive not armed: {}", e);
        }
    }

    /// Queues `bytes` and starts transmitting if the UART is idle.
    ///
    /// Never blocks and never overwrites queued data. When the ring is short of space the
    /// head of `bytes` is queued and `ResourceExhausted { written }` says how much; retry the
    /// rest later. `HardwareBusy` means every byte was queued but the UART refused to start,
    /// see [`Port::kick`].
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        if !self.engine.is_initialized() {
            return Err(Error::NotInitialized);
        }
        let written = self.tx.write(bytes);
        let kicked = self.kick();
        if written < bytes.len() {
            return Err(Error::ResourceExhausted { written });
        }
        kicked.map(|()| written)
    }

    /// Starts a transmit when the UART is idle and data is queued.
    pub fn kick(&mut self) -> Result<(), Error> {
        if !self.engine.is_initialized() {
            return Err(Error::NotInitialized);
        }
        if self.tx.is_empty() || !self.engine.try_claim_tx() {
            return Ok(());
        }
        let issued = self.engine.issue_next();
        if issued.is_err() {
            log_debug!("serial: transmit refused, {} bytes kept", self.tx.len());
        }
        issued
    }

    /// Reads up to `buf.len()` received bytes. 0 when nothing is waiting or before `init`.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if !self.engine.is_initialized() {
            return 0;
        }
        self.rx.read(buf)
    }

    pub fn available(&self) -> usize {
        if !self.engine.is_initialized() {
            return 0;
        }
        self.rx.len()
    }

    /// Free room in the TX ring.
    pub fn write_space(&self) -> usize {
        self.tx.free_space()
    }

    /// Throws away everything received so far and re-arms receive.
    ///
    /// Receive is disarmed before the ring is touched, so a byte arriving during the restart
    /// is lost rather than half-stored. Does nothing before `init`.
    pub fn restart_rx(&mut self) {
        if !self.engine.is_initialized() {
            return;
        }
        self.engine.disarm_receive();
        self.rx.clear();
        if let Err(e) = self.engine.arm_receive() {
            log_warn!("serial restart: receive not armed: {}", e);
        }
    }

    /// Busy-waits until everything queued has gone out, for at most `timeout_ms`.
    ///
    /// On timeout the transmit in flight is aborted and the TX ring emptied. Only meant for
    /// bring-up and shutdown.
    pub fn flush<C: Clock>(&mut self, clock: &C, timeout_ms: u32) -> Result<(), Error> {
        if !self.engine.is_initialized() {
            return Err(Error::NotInitialized);
        }
        let start = clock.now_ms();
        loop {
            if self.tx.is_empty() && self.engine.is_idle_tx() {
                return Ok(());
            }
            if clock.now_ms().wrapping_sub(start) >= timeout_ms {
                break;
            }
            // a refused transfer leaves data queued with nothing in flight
            let _ = self.kick();
            core::hint::spin_loop();
        }
        self.engine.abort_tx();
        self.tx.clear();
        self.engine.note_flush_timeout();
        Err(Error::Timeout)
    }

    pub fn is_idle_tx(&self) -> bool {
        self.engine.is_idle_tx()
    }

    pub fn is_idle_rx(&self) -> bool {
        self.engine.is_idle_rx()
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    pub fn hardware(&self) -> &H {
        self.engine.hardware()
    }
}

impl<'a, H, const RX: usize, const TX: usize, const CHUNK: usize> ByteStream
    for Port<'a, H, RX, TX, CHUNK>
where
    H: UartHardware,
{
    fn available(&self) -> usize {
        Port::available(self)
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        Port::read(self, buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        Port::write(self, bytes)
    }

    fn write_space(&self) -> usize {
        Port::write_space(self)
    }
}

/// Formatted output truncates when the ring fills up; nothing waits for room.
impl<'a, H, const RX: usize, const TX: usize, const CHUNK: usize> fmt::Write
    for Port<'a, H, RX, TX, CHUNK>
where
    H: UartHardware,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match Port::write(self, s.as_bytes()) {
            Ok(_) | Err(Error::HardwareBusy) => Ok(()),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl<'a, H, const RX: usize, const TX: usize, const CHUNK: usize> SerialPort
    for Port<'a, H, RX, TX, CHUNK>
where
    H: UartHardware,
{
    fn init(&mut self) {
        Port::init(self)
    }

    fn restart_rx(&mut self) {
        Port::restart_rx(self)
    }

    fn kick(&mut self) -> Result<(), Error> {
        Port::kick(self)
    }

    fn flush<C: Clock>(&mut self, clock: &C, timeout_ms: u32) -> Result<(), Error> {
        Port::flush(self, clock, timeout_ms)
    }

    fn is_idle_tx(&self) -> bool {
        Port::is_idle_tx(self)
    }

    fn is_idle_rx(&self) -> bool {
        Port::is_idle_rx(self)
    }

    fn stats(&self) -> EngineStats {
        Port::stats(self)
    }
}

/// Interrupt half of an [`Engine`]: fills the RX ring and drains the TX ring.
///
/// Call these from the UART's interrupt handler only.
pub struct IrqPort<'a, H, const RX: usize, const TX: usize, const CHUNK: usize> {
    engine: &'a Engine<H, RX, TX, CHUNK>,
    rx: Producer<'a, RX>,
}

impl<'a, H, const RX: usize, const TX: usize, const CHUNK: usize> IrqPort<'a, H, RX, TX, CHUNK>
where
    H: UartHardware,
{
    pub(super) fn new(engine: &'a Engine<H, RX, TX, CHUNK>, rx: Producer<'a, RX>) -> Self {
        Self { engine, rx }
    }

    /// Stores a received chunk and re-arms receive.
    ///
    /// A full RX ring loses its oldest bytes; the newest always get in. Ignored until the
    /// engine has been through `init()`.
    pub fn on_receive_complete(&mut self, chunk: &[u8], flags: RxFlags) {
        if !self.engine.is_initialized() {
            return;
        }
        let mut dropped = 0u32;
        for &byte in chunk {
            if self.rx.push_overwrite(byte) {
                dropped += 1;
            }
        }
        let line_error = flags.framing || flags.noise || flags.parity;
        self.engine.receive_done(flags.overrun, line_error, dropped);
    }

    /// Sends the next queued chunk, or marks TX idle when nothing is left.
    pub fn on_transmit_complete(&mut self) {
        if self.engine.is_idle_tx() {
            // late completion after an abort; the main loop owns TX now
            return;
        }
        // a refusal already put the bytes back and released the token
        let _ = self.engine.issue_next();
    }

    pub fn hardware(&self) -> &H {
        self.engine.hardware()
    }
}
