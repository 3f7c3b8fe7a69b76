//! USARTs with DMA transmit and interrupt-driven receive.
//!
//! Each transmit chunk is copied into a static buffer and sent as one DMA memory-to-peripheral
//! transfer; the stream's transfer-complete interrupt hands the port its next chunk. Receive
//! completes per byte from the RXNE interrupt.

use core::cell::RefCell;

use cortex_m::interrupt::{self, Mutex};
use crsf_pwm_firmware::log_warn;
use crsf_pwm_firmware::platform::traits::{RxFlags, UartHardware};
use crsf_pwm_firmware::platform::HardwareError;
use crsf_pwm_firmware::serial::IrqPort;
use embedded_dma::StaticReadBuffer;
use stm32f4xx_hal::dma::{
    config::DmaConfig, traits::Stream, MemoryToPeripheral, Stream3, Stream6, Stream7, Transfer,
};
use stm32f4xx_hal::hal::serial::Read;
use stm32f4xx_hal::nb;
use stm32f4xx_hal::serial;
use stm32f4xx_hal::stm32::{DMA1, DMA2, USART1, USART2, USART3};
use stm32f4xx_hal::time::Bps;

/// Largest chunk any engine hands to the hardware.
pub const STAGING: usize = 64;

/// 8N1, transmit through DMA.
pub fn config(baudrate: Bps) -> serial::config::Config {
    serial::config::Config {
        baudrate,
        wordlength: serial::config::WordLength::DataBits8,
        parity: serial::config::Parity::ParityNone,
        stopbits: serial::config::StopBits::STOP1,
        dma: serial::config::DmaConfig::Tx,
    }
}

/// Single-buffer stream setup for a transmit transfer.
pub fn dma_config() -> DmaConfig {
    DmaConfig::default()
        .memory_increment(true)
        .transfer_complete_interrupt(true)
        .transfer_error_interrupt(true)
}

/// A static transmit buffer that only hands the first `len` bytes to the DMA.
pub struct TxBuffer {
    bytes: &'static mut [u8; STAGING],
    len: usize,
}

impl TxBuffer {
    pub fn new(bytes: &'static mut [u8; STAGING]) -> Self {
        Self { bytes, len: 0 }
    }

    fn fill(&mut self, chunk: &[u8]) {
        self.bytes[..chunk.len()].copy_from_slice(chunk);
        self.len = chunk.len();
    }
}

// SAFETY: the buffer is `'static` and only refilled while its stream is disabled.
unsafe impl StaticReadBuffer for TxBuffer {
    type Word = u8;

    unsafe fn static_read_buffer(&self) -> (*const u8, usize) {
        (self.bytes.as_ptr(), self.len)
    }
}

/// Where a port's transmit transfer is.
pub enum TxState<T> {
    /// Stream disabled, the buffer may be refilled.
    Idle(T),
    /// Stream enabled, waiting for transfer complete.
    Running(T),
}

/// Transfer and receiver types for one USART.
pub trait Instance {
    type TxTransfer;
    type Rx;
}

/// USART1_TX is DMA2 stream 7, channel 4.
pub type Usart1Transfer =
    Transfer<Stream7<DMA2>, serial::Tx<USART1>, MemoryToPeripheral, TxBuffer, 4>;
/// USART2_TX is DMA1 stream 6, channel 4.
pub type Usart2Transfer =
    Transfer<Stream6<DMA1>, serial::Tx<USART2>, MemoryToPeripheral, TxBuffer, 4>;
/// USART3_TX is DMA1 stream 3, channel 4.
pub type Usart3Transfer =
    Transfer<Stream3<DMA1>, serial::Tx<USART3>, MemoryToPeripheral, TxBuffer, 4>;

/// [`UartHardware`] for one USART.
///
/// Starts detached; [`Usart::attach`] hands it the transfer and receiver once `init` has built
/// them. Until then every start fails with `Fault`.
pub struct Usart<U: Instance> {
    tx: Mutex<RefCell<Option<TxState<U::TxTransfer>>>>,
    rx: Mutex<RefCell<Option<U::Rx>>>,
}

impl<U: Instance> Usart<U> {
    pub const fn new() -> Self {
        Self {
            tx: Mutex::new(RefCell::new(None)),
            rx: Mutex::new(RefCell::new(None)),
        }
    }

    pub fn attach(&self, transfer: U::TxTransfer, rx: U::Rx) {
        interrupt::free(|cs| {
            self.tx.borrow(cs).replace(Some(TxState::Idle(transfer)));
            self.rx.borrow(cs).replace(Some(rx));
        });
    }
}

/// Interrupt-side access to a USART, one implementation per instance.
pub trait DmaUsart: UartHardware {
    /// Reads the receive data register. `None` while detached.
    fn read_byte(&self) -> Option<nb::Result<u8, serial::Error>>;

    /// Transfer-complete bookkeeping. True when a running transmit just finished.
    fn finish_transmit(&self) -> bool;
}

macro_rules! usart {
    ($($USART:ident: ($Transfer:ty, $STREAM:ty),)+) => {
        $(
            impl Instance for $USART {
                type TxTransfer = $Transfer;
                type Rx = serial::Rx<$USART>;
            }

            impl UartHardware for Usart<$USART> {
                fn start_transmit(&self, chunk: &[u8]) -> Result<(), HardwareError> {
                    if chunk.len() > STAGING {
                        return Err(HardwareError::Fault);
                    }
                    interrupt::free(|cs| {
                        let mut slot = self.tx.borrow(cs).borrow_mut();
                        let mut transfer = match slot.take() {
                            Some(TxState::Idle(transfer)) => transfer,
                            Some(running) => {
                                *slot = Some(running);
                                return Err(HardwareError::Busy);
                            }
                            None => return Err(HardwareError::Fault),
                        };
                        // SAFETY: single-buffer mode on an idle stream, nothing reads the
                        // buffer while it is refilled
                        let started = unsafe {
                            transfer.next_transfer_with(|mut buffer, _| {
                                buffer.fill(chunk);
                                (buffer, ())
                            })
                        }
                        .is_ok();
                        if started {
                            *slot = Some(TxState::Running(transfer));
                            Ok(())
                        } else {
                            *slot = Some(TxState::Idle(transfer));
                            Err(HardwareError::Fault)
                        }
                    })
                }

                fn abort_transmit(&self) {
                    interrupt::free(|cs| {
                        let mut slot = self.tx.borrow(cs).borrow_mut();
                        if let Some(TxState::Running(mut transfer) | TxState::Idle(mut transfer)) =
                            slot.take()
                        {
                            transfer.pause(|_| {});
                            transfer.clear_interrupts();
                            *slot = Some(TxState::Idle(transfer));
                        }
                    });
                }

                fn start_receive(&self) -> Result<(), HardwareError> {
                    interrupt::free(|cs| match self.rx.borrow(cs).borrow_mut().as_mut() {
                        Some(rx) => {
                            rx.listen();
                            Ok(())
                        }
                        None => Err(HardwareError::Fault),
                    })
                }

                fn abort_receive(&self) {
                    interrupt::free(|cs| {
                        if let Some(rx) = self.rx.borrow(cs).borrow_mut().as_mut() {
                            rx.unlisten();
                        }
                    });
                }
            }

            impl DmaUsart for Usart<$USART> {
                fn read_byte(&self) -> Option<nb::Result<u8, serial::Error>> {
                    interrupt::free(|cs| {
                        self.rx.borrow(cs).borrow_mut().as_mut().map(|rx| rx.read())
                    })
                }

                fn finish_transmit(&self) -> bool {
                    let failed = <$STREAM>::get_transfer_error_flag();
                    let finished = interrupt::free(|cs| {
                        let mut slot = self.tx.borrow(cs).borrow_mut();
                        match slot.take() {
                            Some(TxState::Running(mut transfer)) => {
                                // DMA doesn't clear its own interrupt flags
                                transfer.clear_interrupts();
                                transfer.pause(|_| {});
                                *slot = Some(TxState::Idle(transfer));
                                true
                            }
                            Some(TxState::Idle(mut transfer)) => {
                                transfer.clear_interrupts();
                                *slot = Some(TxState::Idle(transfer));
                                false
                            }
                            None => false,
                        }
                    });
                    if failed {
                        log_warn!("{}: DMA transfer error", stringify!($USART));
                    }
                    finished
                }
            }
        )+
    };
}

usart! {
    USART1: (Usart1Transfer, Stream7<DMA2>),
    USART2: (Usart2Transfer, Stream6<DMA1>),
    USART3: (Usart3Transfer, Stream3<DMA1>),
}

fn rx_flags(error: serial::Error) -> RxFlags {
    #[allow(unreachable_patterns)]
    match error {
        serial::Error::Overrun => RxFlags {
            overrun: true,
            ..RxFlags::NONE
        },
        serial::Error::Framing => RxFlags {
            framing: true,
            ..RxFlags::NONE
        },
        serial::Error::Noise => RxFlags {
            noise: true,
            ..RxFlags::NONE
        },
        serial::Error::Parity => RxFlags {
            parity: true,
            ..RxFlags::NONE
        },
        _ => RxFlags {
            framing: true,
            ..RxFlags::NONE
        },
    }
}

/// USART interrupt body: hands the received byte to the engine.
///
/// A read that reports an error has already discarded its byte, so only the flags go up.
pub fn on_usart_interrupt<H, const RX: usize, const TX: usize, const CHUNK: usize>(
    irq: &mut IrqPort<'_, H, RX, TX, CHUNK>,
) where
    H: DmaUsart,
{
    match irq.hardware().read_byte() {
        Some(Ok(byte)) => irq.on_receive_complete(&[byte], RxFlags::NONE),
        Some(Err(nb::Error::Other(error))) => irq.on_receive_complete(&[], rx_flags(error)),
        // nothing waiting, or not attached yet
        Some(Err(nb::Error::WouldBlock)) | None => {}
    }
}

/// DMA stream interrupt body: a finished transmit pulls the port's next chunk.
pub fn on_dma_interrupt<H, const RX: usize, const TX: usize, const CHUNK: usize>(
    irq: &mut IrqPort<'_, H, RX, TX, CHUNK>,
) where
    H: DmaUsart,
{
    if irq.hardware().finish_transmit() {
        irq.on_transmit_complete();
    }
}
