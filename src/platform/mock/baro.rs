use crate::platform::traits::{BaroSample, Barometer};

/// Barometer returning whatever altitude the test last set.
#[derive(Debug, Default)]
pub struct MockBaro {
    altitude_m: Option<f32>,
    samples: u32,
}

impl MockBaro {
    pub fn new(altitude_m: f32) -> Self {
        Self {
            altitude_m: Some(altitude_m),
            samples: 0,
        }
    }

    /// `None` makes the next reads fail.
    pub fn set_altitude(&mut self, altitude_m: Option<f32>) {
        self.altitude_m = altitude_m;
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}

impl Barometer for MockBaro {
    fn sample(&mut self, _qnh_hpa: f32) -> Option<BaroSample> {
        self.samples += 1;
        self.altitude_m.map(|altitude_m| BaroSample {
            altitude_m,
            temperature_c: 20.0,
            pressure_pa: 101_325.0,
        })
    }
}
