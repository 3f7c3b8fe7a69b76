use crate::app::on_adc;
use crate::board::{self, clock};

pub(crate) fn on_adc(context: on_adc::Context) {
    // the main loop keeps MILLIS current; a stale value only shortens one measured period
    context
        .local
        .adc
        .on_interrupt(&board::ADC_READING, clock::millis());
}
