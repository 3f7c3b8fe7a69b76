//! Sensor conditioning: battery monitor and barometric altitude.

mod altitude;
mod battery;

pub use altitude::{AltitudeFilter, AltitudeReading};
pub use battery::{BatteryMonitor, BatteryReading};
