use core::fmt;

/// Failures reported by the serial engines and the tasks built on them.
///
/// None of these are fatal. Every caller either retries on its next scheduled run or, for
/// `LinkStalled`, the recovery has already happened by the time the value is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The TX ring could not take the whole write; `written` bytes were queued.
    ResourceExhausted { written: usize },
    /// The engine has not been through `init()` yet.
    NotInitialized,
    /// The UART refused a transfer. Nothing was lost; the bytes are back in the ring.
    HardwareBusy,
    /// `flush()` ran out of time and discarded the TX ring.
    Timeout,
    /// The RC link was silent for too long and its receive path was restarted.
    LinkStalled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceExhausted { written } => {
                write!(f, "TX ring full, only {} bytes queued", written)
            }
            Error::NotInitialized => write!(f, "serial engine not initialized"),
            Error::HardwareBusy => write!(f, "UART refused the transfer"),
            Error::Timeout => write!(f, "flush timed out, TX data discarded"),
            Error::LinkStalled => write!(f, "link stalled, receive path restarted"),
        }
    }
}
