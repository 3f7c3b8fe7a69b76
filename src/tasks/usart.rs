use rtic::mutex_prelude::*;

use crate::app::{on_usart1, on_usart2, on_usart3};
use crate::board::usart;

/// CRSF receiver interrupt.
pub(crate) fn on_usart1(mut context: on_usart1::Context) {
    context.shared.crsf_irq.lock(|irq| usart::on_usart_interrupt(irq));
}

/// Debug console interrupt.
pub(crate) fn on_usart2(mut context: on_usart2::Context) {
    context.shared.debug_irq.lock(|irq| usart::on_usart_interrupt(irq));
}

/// GNSS receiver interrupt.
pub(crate) fn on_usart3(mut context: on_usart3::Context) {
    context.shared.gnss_irq.lock(|irq| usart::on_usart_interrupt(irq));
}
