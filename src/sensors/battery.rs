use serde::Serialize;

use crate::config::{ADC_OVERSAMPLING, BATTERY_FILTER_ALPHA};

/// Full scale of the 12-bit converter
const ADC_FULL_SCALE: f32 = 4095.0;
const ADC_REFERENCE_V: f32 = 3.3;
const ADC_GAIN: f32 = 1.01;
const VOLTAGE_DIVIDER: f32 = 11.0;
const SHUNT_OHMS: f32 = 0.066;
const CURRENT_OFFSET_A: f32 = 0.015;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BatteryReading {
    pub voltage_v: f32,
    pub current_a: f32,
}

/// IIR-filtered battery voltage and current from the two ADC channels.
#[derive(Debug, Default)]
pub struct BatteryMonitor {
    voltage_raw: f32,
    current_raw: f32,
    reading: BatteryReading,
    last_sample_ms: Option<u32>,
    period_ms: u32,
}

impl BatteryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in one oversampled conversion pair taken at `now_ms`.
    pub fn update(&mut self, voltage_raw: u32, current_raw: u32, now_ms: u32) -> BatteryReading {
        let beta = 1.0 - BATTERY_FILTER_ALPHA;
        self.voltage_raw = self.voltage_raw * beta + voltage_raw as f32 * BATTERY_FILTER_ALPHA;
        self.current_raw = self.current_raw * beta + current_raw as f32 * BATTERY_FILTER_ALPHA;

        let volts_per_count = ADC_REFERENCE_V / ADC_FULL_SCALE * ADC_GAIN / ADC_OVERSAMPLING as f32;
        self.reading = BatteryReading {
            voltage_v: self.voltage_raw * volts_per_count * VOLTAGE_DIVIDER,
            current_a: self.current_raw * volts_per_count / SHUNT_OHMS - CURRENT_OFFSET_A,
        };

        if let Some(last) = self.last_sample_ms {
            self.period_ms = now_ms.wrapping_sub(last);
        }
        self.last_sample_ms = Some(now_ms);
        self.reading
    }

    pub fn reading(&self) -> BatteryReading {
        self.reading
    }

    /// Time between the last two conversions.
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_converges_to_input() {
        let mut monitor = BatteryMonitor::new();
        // 1.0 V at the pin, oversampled x16
        let raw = (1.0 / 3.3 * 4095.0 * 16.0) as u32;
        for t in 0..100 {
            monitor.update(raw, 0, t * 22);
        }
        let reading = monitor.reading();
        assert!((reading.voltage_v - 11.0 * 1.01).abs() < 0.01);
        assert!((reading.current_a + CURRENT_OFFSET_A).abs() < 1e-6);
        assert_eq!(monitor.period_ms(), 22);
    }

    #[test]
    fn test_first_sample_is_filtered() {
        let mut monitor = BatteryMonitor::new();
        let raw = 20_000;
        let reading = monitor.update(raw, 0, 0);
        let expected = raw as f32 * BATTERY_FILTER_ALPHA * 3.3 / 4095.0 * 11.0 * 1.01 / 16.0;
        assert!((reading.voltage_v - expected).abs() < 1e-3);
        assert_eq!(monitor.period_ms(), 0);
    }
}
