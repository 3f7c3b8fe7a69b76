//! In-memory implementations of the platform traits.
//!
//! Everything here is `no_std` and allocation free, so the same mocks serve unit tests,
//! integration tests and doc examples.

use core::marker::PhantomData;

mod baro;
mod clock;
mod gnss;
mod rc_link;
mod servo;
mod uart;

pub use baro::MockBaro;
pub use clock::MockClock;
pub use gnss::MockGnss;
pub use rc_link::{MockRcLink, QueuedFrame};
pub use servo::MockServo;
pub use uart::{MockUart, MOCK_TX_LOG};

use crate::platform::traits::Platform;
use crate::serial::{CrsfPort, DebugPort, GnssPort};

/// Host platform: real serial engines over [`MockUart`]s, mock everything else.
pub struct MockPlatform<'a>(PhantomData<&'a ()>);

impl<'a> Platform for MockPlatform<'a> {
    type CrsfPort = CrsfPort<'a, MockUart>;
    type DebugPort = DebugPort<'a, MockUart>;
    type GnssPort = GnssPort<'a, MockUart>;
    type RcLink = MockRcLink;
    type Gnss = MockGnss;
    type Barometer = MockBaro;
    type Servo = MockServo;
}
