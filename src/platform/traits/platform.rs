//! Root platform trait
//!
//! Bundles the concrete peripheral types one board provides, so the controller takes a single
//! type parameter instead of one per peripheral.

use super::{Barometer, Gnss, RcLink, ServoChannel};
use crate::serial::SerialPort;

pub trait Platform {
    /// Serial port the RC receiver is wired to
    type CrsfPort: SerialPort;
    /// Serial port carrying the human-readable status lines
    type DebugPort: SerialPort;
    /// Serial port the GNSS module is wired to
    type GnssPort: SerialPort;
    type RcLink: RcLink;
    type Gnss: Gnss;
    type Barometer: Barometer;
    type Servo: ServoChannel;
}
