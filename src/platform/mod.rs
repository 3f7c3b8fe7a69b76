//! Hardware seams.
//!
//! The core only sees the traits in [`traits`]. The firmware binary implements them on the
//! STM32 peripherals; [`mock`] implements them in memory for host tests.

pub mod error;
pub mod mock;
pub mod traits;

pub use error::HardwareError;
