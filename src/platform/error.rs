//! Errors returned by hardware implementations of the platform traits.

use core::fmt;

/// A hardware transfer could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// The peripheral still has a transfer in progress
    Busy,
    /// The peripheral reported an error or is not configured
    Fault,
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareError::Busy => write!(f, "peripheral busy"),
            HardwareError::Fault => write!(f, "peripheral fault"),
        }
    }
}
