//! Battery voltage and current on ADC1 channels 10 and 11.
//!
//! The two channels form a scanned regular sequence with an interrupt after every conversion.
//! The HAL has no injected-group support, which would otherwise deliver the pair in one
//! interrupt.

use crsf_pwm_firmware::config::ADC_OVERSAMPLING;
use crsf_pwm_firmware::platform::traits::AdcReading;
use stm32f4xx_hal::adc::{
    config::{AdcConfig, Clock, Eoc, SampleTime, Scan, Sequence},
    Adc,
};
use stm32f4xx_hal::gpio::{
    gpioc::{PC0, PC1},
    Analog,
};
use stm32f4xx_hal::stm32::ADC1;

/// Software oversampler. Each pair of interrupts adds one voltage and one current sample;
/// after [`ADC_OVERSAMPLING`] pairs the sums are published.
pub struct BatteryAdc {
    adc: Adc<ADC1>,
    /// Next conversion is the current channel.
    current_next: bool,
    conversions: u32,
    voltage_sum: u32,
    current_sum: u32,
}

impl BatteryAdc {
    /// Configures the converter. It stays idle until [`BatteryAdc::start`].
    pub fn new(adc: ADC1, voltage: &PC0<Analog>, current: &PC1<Analog>) -> Self {
        let config = AdcConfig::default()
            .clock(Clock::Pclk2_div_4)
            .scan(Scan::Enabled)
            .end_of_conversion_interrupt(Eoc::Conversion);
        let mut adc = Adc::adc1(adc, true, config);
        adc.configure_channel(voltage, Sequence::One, SampleTime::Cycles_480);
        adc.configure_channel(current, Sequence::Two, SampleTime::Cycles_480);

        Self {
            adc,
            current_next: false,
            conversions: 0,
            voltage_sum: 0,
            current_sum: 0,
        }
    }

    pub fn start(&mut self) {
        self.current_next = false;
        self.adc.start_conversion();
    }

    /// ADC interrupt body.
    pub fn on_interrupt(&mut self, reading: &AdcReading, now_ms: u32) {
        // reading the data register clears EOC
        let sample = self.adc.current_sample() as u32;
        if !self.current_next {
            self.voltage_sum += sample;
            self.current_next = true;
            return;
        }
        self.current_sum += sample;
        self.conversions += 1;

        if self.conversions >= ADC_OVERSAMPLING {
            reading.publish(self.voltage_sum, self.current_sum, now_ms);
            self.conversions = 0;
            self.voltage_sum = 0;
            self.current_sum = 0;
        }
        self.start();
    }
}
