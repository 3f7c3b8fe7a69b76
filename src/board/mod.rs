//! STM32F446 implementations of the platform traits.
//!
//! | role  | peripheral | pins      | TX DMA          |
//! |-------|------------|-----------|-----------------|
//! | CRSF  | USART1     | PB6/PB7   | DMA2 stream 7   |
//! | debug | USART2     | PA2/PA3   | DMA1 stream 6   |
//! | GNSS  | USART3     | PC10/PC11 | DMA1 stream 3   |
//! | VBAT  | ADC1 IN10  | PC0       |                 |
//! | IBAT  | ADC1 IN11  | PC1       |                 |
//!
//! Servo outputs are listed in [`servo::Channel`] order.

use crsf_pwm_firmware::platform::traits::{AdcReading, Platform};
use crsf_pwm_firmware::serial::{
    CrsfEngine, CrsfPort, DebugEngine, DebugPort, Engine, GnssEngine, GnssPort,
};
use crsf_pwm_firmware::ubx::UbxGnss;
use stm32f4xx_hal::stm32::{USART1, USART2, USART3};

pub mod adc;
pub mod baro;
pub mod clock;
pub mod crsf_link;
// reads the timer counters directly
#[allow(unsafe_code)]
pub mod servo;
// implements `StaticReadBuffer` and restarts DMA transfers
#[allow(unsafe_code)]
pub mod usart;

pub use adc::BatteryAdc;
pub use baro::NoBarometer;
pub use clock::MonoClock;
pub use crsf_link::CrsfLink;
pub use servo::PwmOutput;
pub use usart::Usart;

/// Core clock, also the monotonic's tick rate.
pub const SYSCLK_HZ: u32 = 84_000_000;

/* serial engines, split once in init */

pub static CRSF: CrsfEngine<Usart<USART1>> = Engine::new(Usart::new());
pub static DEBUG: DebugEngine<Usart<USART2>> = Engine::new(Usart::new());
pub static GNSS: GnssEngine<Usart<USART3>> = Engine::new(Usart::new());

/// Latest battery conversion, written by the ADC interrupt.
pub static ADC_READING: AdcReading = AdcReading::new();

/// The flight peripheral board.
pub struct Board;

impl Platform for Board {
    type CrsfPort = CrsfPort<'static, Usart<USART1>>;
    type DebugPort = DebugPort<'static, Usart<USART2>>;
    type GnssPort = GnssPort<'static, Usart<USART3>>;
    type RcLink = CrsfLink;
    type Gnss = UbxGnss;
    type Barometer = NoBarometer;
    type Servo = PwmOutput;
}
