//! Servo PWM on TIM1, TIM2 and TIM3.
//!
//! The HAL sets up each timer for a 50 Hz frame. Pulse widths are converted between
//! microseconds and duty ticks against the channel's max duty, which is the frame length in
//! ticks.

use crsf_pwm_firmware::config::SERVO_CHANNELS;
use crsf_pwm_firmware::platform::traits::ServoChannel;
use stm32f4xx_hal::gpio::{
    gpioa::{PA0, PA1, PA10, PA11, PA6, PA7, PA8, PA9},
    gpiob::{PB0, PB1},
    Alternate,
};
use stm32f4xx_hal::hal::PwmPin;
use stm32f4xx_hal::prelude::*;
use stm32f4xx_hal::pwm::{PwmChannel, C1, C2, C3, C4};
use stm32f4xx_hal::rcc::Clocks;
use stm32f4xx_hal::stm32::{TIM1, TIM2, TIM3};
use stm32f4xx_hal::timer::Timer;

/// Frame length.
const FRAME_US: u32 = 20_000;
const FRAME_HZ: u32 = 1_000_000 / FRAME_US;

pub type Tim1Pins = (
    PA8<Alternate<1>>,
    PA9<Alternate<1>>,
    PA10<Alternate<1>>,
    PA11<Alternate<1>>,
);
pub type Tim2Pins = (PA0<Alternate<1>>, PA1<Alternate<1>>);
pub type Tim3Pins = (
    PA6<Alternate<2>>,
    PA7<Alternate<2>>,
    PB0<Alternate<2>>,
    PB1<Alternate<2>>,
);

macro_rules! channels {
    ($($Variant:ident: ($TIM:ident, $C:ident),)+) => {
        /// A HAL PWM channel of any of the three timers.
        pub enum Channel {
            $($Variant(PwmChannel<$TIM, $C>),)+
        }

        impl Channel {
            fn pin(&self) -> &dyn PwmPin<Duty = u16> {
                match self {
                    $(Channel::$Variant(pwm) => pwm,)+
                }
            }

            fn pin_mut(&mut self) -> &mut dyn PwmPin<Duty = u16> {
                match self {
                    $(Channel::$Variant(pwm) => pwm,)+
                }
            }

            /// Counter of the channel's timer. The HAL's PWM channels don't expose it.
            fn counter_ticks(&self) -> u32 {
                match self {
                    // SAFETY: read-only access to CNT, which nothing else writes once the
                    // timer runs
                    $(Channel::$Variant(_) => unsafe { (*$TIM::ptr()).cnt.read().bits() },)+
                }
            }
        }
    };
}

// Output order, servo 1 first: TIM2 on PA0/PA1, TIM3 on PA6/PA7/PB0/PB1, TIM1 on PA8..PA11.
channels! {
    Tim2Ch1: (TIM2, C1),
    Tim2Ch2: (TIM2, C2),
    Tim3Ch1: (TIM3, C1),
    Tim3Ch2: (TIM3, C2),
    Tim3Ch3: (TIM3, C3),
    Tim3Ch4: (TIM3, C4),
    Tim1Ch1: (TIM1, C1),
    Tim1Ch2: (TIM1, C2),
    Tim1Ch3: (TIM1, C3),
    Tim1Ch4: (TIM1, C4),
}

/// Rounds `value * num / den` to the nearest integer.
fn scale(value: u32, num: u32, den: u32) -> u32 {
    (value * num + den / 2) / den
}

/// One servo output.
pub struct PwmOutput {
    channel: Channel,
    enabled: bool,
}

impl PwmOutput {
    fn frame_ticks(&self) -> u32 {
        self.channel.pin().get_max_duty() as u32
    }
}

impl ServoChannel for PwmOutput {
    fn counter(&self) -> u16 {
        scale(self.channel.counter_ticks(), FRAME_US, self.frame_ticks()) as u16
    }

    fn compare(&self) -> u16 {
        let duty = self.channel.pin().get_duty() as u32;
        scale(duty, FRAME_US, self.frame_ticks()) as u16
    }

    fn set_compare(&mut self, pulse_us: u16) {
        let duty = scale(pulse_us as u32, self.frame_ticks(), FRAME_US);
        self.channel.pin_mut().set_duty(duty as u16);
    }

    fn enable(&mut self) {
        self.channel.pin_mut().enable();
        self.enabled = true;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Starts the three timers and returns the ten outputs, servo 1 first, all disabled.
pub fn outputs(
    tim1: TIM1,
    tim2: TIM2,
    tim3: TIM3,
    pins: (Tim1Pins, Tim2Pins, Tim3Pins),
    clocks: &Clocks,
) -> [PwmOutput; SERVO_CHANNELS] {
    let (tim1_pins, tim2_pins, tim3_pins) = pins;
    let (t1c1, t1c2, t1c3, t1c4) = Timer::new(tim1, clocks).pwm(tim1_pins, FRAME_HZ.hz());
    let (t2c1, t2c2) = Timer::new(tim2, clocks).pwm(tim2_pins, FRAME_HZ.hz());
    let (t3c1, t3c2, t3c3, t3c4) = Timer::new(tim3, clocks).pwm(tim3_pins, FRAME_HZ.hz());

    [
        Channel::Tim2Ch1(t2c1),
        Channel::Tim2Ch2(t2c2),
        Channel::Tim3Ch1(t3c1),
        Channel::Tim3Ch2(t3c2),
        Channel::Tim3Ch3(t3c3),
        Channel::Tim3Ch4(t3c4),
        Channel::Tim1Ch1(t1c1),
        Channel::Tim1Ch2(t1c2),
        Channel::Tim1Ch3(t1c3),
        Channel::Tim1Ch4(t1c4),
    ]
    .map(|channel| PwmOutput {
        channel,
        enabled: false,
    })
}
