use rtic::mutex_prelude::*;

use crate::app::{on_dma1_stream3, on_dma1_stream6, on_dma2_stream7};
use crate::board::usart;

/// USART1 transmit finished.
pub(crate) fn on_dma2_stream7(mut context: on_dma2_stream7::Context) {
    context.shared.crsf_irq.lock(|irq| usart::on_dma_interrupt(irq));
}

/// USART2 transmit finished.
pub(crate) fn on_dma1_stream6(mut context: on_dma1_stream6::Context) {
    context.shared.debug_irq.lock(|irq| usart::on_dma_interrupt(irq));
}

/// USART3 transmit finished.
pub(crate) fn on_dma1_stream3(mut context: on_dma1_stream3::Context) {
    context.shared.gnss_irq.lock(|irq| usart::on_dma_interrupt(irq));
}
