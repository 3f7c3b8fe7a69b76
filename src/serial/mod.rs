//! Interrupt-driven duplex serial transport.
//!
//! One [`Engine`] per UART owns an RX ring, a TX ring and the two handshake flags. It is split
//! once into a [`Port`] for the main loop and an [`IrqPort`] for the UART interrupt handler:
//!
//! | state        | written by                                   |
//! |--------------|----------------------------------------------|
//! | RX `head`    | `IrqPort` (receive completion)               |
//! | RX `tail`    | `Port` (`read`, `restart_rx`)                |
//! | TX `head`    | `Port` (`write`, `flush` timeout)            |
//! | TX `tail`    | whoever holds the TX token                   |
//! | TX ready     | `Port` sets busy, `IrqPort` sets idle        |
//!
//! The TX token is the ready flag: while it reads idle the main loop may pull from the TX ring
//! and start a transfer; once a transfer is in flight only the transmit completion pulls.

mod engine;
mod port;

pub use engine::{Engine, EngineStats};
pub use port::{IrqPort, Port};

use crate::config::{
    CRSF_RX_CAPACITY, CRSF_TX_CAPACITY, CRSF_TX_CHUNK, DEBUG_RX_CAPACITY, DEBUG_TX_CAPACITY,
    DEBUG_TX_CHUNK, GNSS_RX_CAPACITY, GNSS_TX_CAPACITY, GNSS_TX_CHUNK,
};
use crate::datamodel::error::Error;
use crate::platform::traits::{ByteStream, Clock};

/* engines sized per UART role */

pub type CrsfEngine<H> = Engine<H, CRSF_RX_CAPACITY, CRSF_TX_CAPACITY, CRSF_TX_CHUNK>;
pub type CrsfPort<'a, H> = Port<'a, H, CRSF_RX_CAPACITY, CRSF_TX_CAPACITY, CRSF_TX_CHUNK>;
pub type CrsfIrq<'a, H> = IrqPort<'a, H, CRSF_RX_CAPACITY, CRSF_TX_CAPACITY, CRSF_TX_CHUNK>;

pub type DebugEngine<H> = Engine<H, DEBUG_RX_CAPACITY, DEBUG_TX_CAPACITY, DEBUG_TX_CHUNK>;
pub type DebugPort<'a, H> = Port<'a, H, DEBUG_RX_CAPACITY, DEBUG_TX_CAPACITY, DEBUG_TX_CHUNK>;
pub type DebugIrq<'a, H> = IrqPort<'a, H, DEBUG_RX_CAPACITY, DEBUG_TX_CAPACITY, DEBUG_TX_CHUNK>;

pub type GnssEngine<H> = Engine<H, GNSS_RX_CAPACITY, GNSS_TX_CAPACITY, GNSS_TX_CHUNK>;
pub type GnssPort<'a, H> = Port<'a, H, GNSS_RX_CAPACITY, GNSS_TX_CAPACITY, GNSS_TX_CHUNK>;
pub type GnssIrq<'a, H> = IrqPort<'a, H, GNSS_RX_CAPACITY, GNSS_TX_CAPACITY, GNSS_TX_CHUNK>;

/// Main-loop view of one serial engine, as used by the tasks.
pub trait SerialPort: ByteStream + core::fmt::Write {
    /// Empties both rings, marks TX idle and arms receive.
    fn init(&mut self);

    /// Drops anything received and re-arms the receive path.
    fn restart_rx(&mut self);

    /// Starts a transmit if the hardware is idle and bytes are waiting.
    fn kick(&mut self) -> Result<(), Error>;

    /// Waits up to `timeout_ms` for the TX ring to drain.
    fn flush<C: Clock>(&mut self, clock: &C, timeout_ms: u32) -> Result<(), Error>;

    fn is_idle_tx(&self) -> bool;

    fn is_idle_rx(&self) -> bool;

    fn stats(&self) -> EngineStats;
}
