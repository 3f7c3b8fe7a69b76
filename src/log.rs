//! Logging macros.
//!
//! The library never talks to a log backend directly. These macros pick one at compile time:
//! - `rtt` feature (the firmware image): `rtt_target::rprintln!`
//! - unit tests: `println!`
//! - anything else: compiled out

#[cfg(feature = "rtt")]
#[doc(hidden)]
pub use rtt_target as __rtt;

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:literal, $($arg:tt)*) => {{
        #[cfg(feature = "rtt")]
        $crate::log::__rtt::rprintln!("[{}] {}", $level, format_args!($($arg)*));

        #[cfg(all(test, not(feature = "rtt")))]
        println!("[{}] {}", $level, format_args!($($arg)*));

        #[cfg(not(any(test, feature = "rtt")))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

/// Log an informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::__log!("INFO", $($arg)*) };
}

/// Log a warning
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::__log!("WARN", $($arg)*) };
}

/// Log an error
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::__log!("ERROR", $($arg)*) };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::__log!("DEBUG", $($arg)*) };
}
