use serde::Serialize;

use crate::config::{ALTITUDE_FILTER_ALPHA, GROUND_SAMPLES};
use crate::platform::traits::BaroSample;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AltitudeReading {
    /// filtered altitude above sea level
    pub altitude_asl_m: f32,
    /// filtered altitude above the ground reference
    pub altitude_agl_m: f32,
    /// filtered vertical speed, positive up
    pub vertical_speed_m_s: f32,
    pub temperature_c: f32,
    pub pressure_pa: f32,
}

/// Barometric altitude and vertical speed.
///
/// The first [`GROUND_SAMPLES`] readings are averaged into the ground reference and passed
/// through unfiltered; after that the altitude is low-pass filtered. Vertical speed is the
/// change in AGL per sample interval, filtered the same way.
#[derive(Debug)]
pub struct AltitudeFilter {
    interval_s: f32,
    ground_sum_m: f32,
    ground_count: u32,
    samples: u32,
    previous_agl_m: f32,
    reading: AltitudeReading,
}

impl AltitudeFilter {
    /// `interval_ms` is the time between calls to [`AltitudeFilter::update`].
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_s: interval_ms.max(1) as f32 / 1000.0,
            ground_sum_m: 0.0,
            ground_count: 0,
            samples: 0,
            previous_agl_m: 0.0,
            reading: AltitudeReading::default(),
        }
    }

    pub fn update(&mut self, sample: BaroSample) -> AltitudeReading {
        let alpha = ALTITUDE_FILTER_ALPHA;
        let beta = 1.0 - alpha;

        let asl = if self.samples < GROUND_SAMPLES {
            self.ground_sum_m += sample.altitude_m;
            self.ground_count += 1;
            sample.altitude_m
        } else {
            alpha * sample.altitude_m + beta * self.reading.altitude_asl_m
        };
        let agl = asl - self.ground_altitude_m();
        let vertical_speed = (agl - self.previous_agl_m) / self.interval_s;

        self.reading = AltitudeReading {
            altitude_asl_m: asl,
            altitude_agl_m: agl,
            vertical_speed_m_s: alpha * vertical_speed + beta * self.reading.vertical_speed_m_s,
            temperature_c: sample.temperature_c,
            pressure_pa: sample.pressure_pa,
        };
        self.previous_agl_m = agl;
        self.samples = self.samples.saturating_add(1);
        self.reading
    }

    /// Average of the ground samples taken so far.
    pub fn ground_altitude_m(&self) -> f32 {
        if self.ground_count == 0 {
            return 0.0;
        }
        self.ground_sum_m / self.ground_count as f32
    }

    /// True once the ground reference is fixed.
    pub fn is_calibrated(&self) -> bool {
        self.samples >= GROUND_SAMPLES
    }

    pub fn reading(&self) -> AltitudeReading {
        self.reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(altitude_m: f32) -> BaroSample {
        BaroSample {
            altitude_m,
            temperature_c: 21.0,
            pressure_pa: 100_000.0,
        }
    }

    #[test]
    fn test_ground_reference_averages_startup_samples() {
        let mut filter = AltitudeFilter::new(125);
        for i in 0..GROUND_SAMPLES {
            let altitude = if i % 2 == 0 { 99.0 } else { 101.0 };
            filter.update(at(altitude));
        }
        assert!(filter.is_calibrated());
        assert!((filter.ground_altitude_m() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_climb_after_calibration() {
        let mut filter = AltitudeFilter::new(125);
        for _ in 0..GROUND_SAMPLES {
            filter.update(at(50.0));
        }
        let settled = filter.reading();
        assert!(settled.altitude_agl_m.abs() < 1e-3);
        assert!(settled.vertical_speed_m_s.abs() < 1e-3);

        // climb at 2 m/s: 0.25 m per 125 ms sample
        let mut altitude = 50.0;
        for _ in 0..200 {
            altitude += 0.25;
            filter.update(at(altitude));
        }
        let reading = filter.reading();
        assert!((reading.vertical_speed_m_s - 2.0).abs() < 0.05);
        assert!(reading.altitude_agl_m > 45.0 && reading.altitude_agl_m < 50.0);
        assert!((filter.ground_altitude_m() - 50.0).abs() < 1e-3);
    }
}
