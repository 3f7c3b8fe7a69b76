use crsf_pwm_firmware::platform::traits::{BaroSample, Barometer};

/// Stand-in for boards without a pressure sensor fitted. Never answers, so the altitude filter
/// keeps its initial state and the baro slots report zero.
pub struct NoBarometer;

impl Barometer for NoBarometer {
    fn sample(&mut self, _qnh_hpa: f32) -> Option<BaroSample> {
        None
    }
}
