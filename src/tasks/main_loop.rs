use crsf_pwm_firmware::controller::MainLoop;
use crsf_pwm_firmware::platform::traits::Clock;
use crsf_pwm_firmware::{log_info, log_warn};

use crate::board::{Board, MonoClock};

/// Brings the board up, then spins the scheduler forever.
pub(crate) fn run_main_loop(main_loop: &mut MainLoop<'static, Board>, clock: &MonoClock) -> ! {
    let report = main_loop.begin(clock);
    if report.gnss {
        log_info!("boot complete");
    } else {
        log_warn!("boot complete without GNSS");
    }

    loop {
        main_loop.step(clock.now_ms());
    }
}
