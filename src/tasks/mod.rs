//! This module contains RTIC tasks for doing various things.
//! Each task is in its own submodule, and is pub(crate) re-exported by this module for usage.
//!

/*
   private interface
*/

/// Receive handlers for the three USARTs.
mod usart;

/// Transmit-complete handlers for the three USART TX DMA streams.
mod dma;

/// Battery ADC oversampling.
mod adc;

/// Bring-up and the cooperative scheduler, run from idle.
mod main_loop;

/*
    public(crate) interface
*/
pub(crate) use adc::on_adc;
pub(crate) use dma::{on_dma1_stream3, on_dma1_stream6, on_dma2_stream7};
pub(crate) use main_loop::run_main_loop;
pub(crate) use usart::{on_usart1, on_usart2, on_usart3};
