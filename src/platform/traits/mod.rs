//! Platform abstraction traits

pub mod clock;
pub mod gnss;
pub mod platform;
pub mod rc_link;
pub mod sensors;
pub mod servo;
pub mod stream;
pub mod uart;

pub use clock::Clock;
pub use gnss::{Gnss, GnssFix};
pub use platform::Platform;
pub use rc_link::RcLink;
pub use sensors::{AdcReading, BaroSample, Barometer};
pub use servo::ServoChannel;
pub use stream::ByteStream;
pub use uart::{RxFlags, UartHardware};
