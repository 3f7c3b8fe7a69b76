#![deny(unsafe_code)]
#![no_main]
#![no_std]

use panic_rtt_target as _panic_handler;

/// STM32F446 implementations of the platform traits
mod board;
/// submodule holding task handlers
mod tasks;

/*
 Declare the RTIC application itself.
 Firstly, we must provide it with the path to the device's PAC.
   - most HALs provide this as their `{hal}::stm32` module.
 We also want the device's peripherals, so we request those.
   - RTIC will provide these on the Context object of init.
 Every task is bound to a hardware interrupt, so no dispatchers are donated.
*/
#[rtic::app(device = stm32f4xx_hal::stm32, peripherals = true)]
mod app {
    use cortex_m::singleton;
    use crsf_pwm_firmware::config::{CRSF_BAUD, DEBUG_BAUD, GNSS_BAUD};
    use crsf_pwm_firmware::controller::{Controller, MainLoop, Peripherals};
    use crsf_pwm_firmware::log_info;
    use crsf_pwm_firmware::serial::{CrsfIrq, DebugIrq, GnssIrq};
    use crsf_pwm_firmware::ubx::UbxGnss;
    use dwt_systick_monotonic::DwtSystick;
    use rtt_target::rtt_init_print;
    use stm32f4xx_hal::{
        dma::{StreamsTuple, Transfer},
        prelude::*,
        serial,
        stm32::{DMA1, DMA2, USART1, USART2, USART3},
    };

    use crate::board::{
        self,
        usart::{self, TxBuffer, STAGING},
        Board, BatteryAdc, CrsfLink, MonoClock, NoBarometer, Usart, SYSCLK_HZ,
    };

    #[monotonic(binds = SysTick, default = true)]
    type SysMono = DwtSystick<SYSCLK_HZ>;

    /* resources shared across RTIC tasks */
    // each interrupt half is shared by its USART and TX DMA stream handlers
    #[shared]
    struct Shared {
        crsf_irq: CrsfIrq<'static, Usart<USART1>>,
        debug_irq: DebugIrq<'static, Usart<USART2>>,
        gnss_irq: GnssIrq<'static, Usart<USART3>>,
    }

    /* resources local to specific RTIC tasks */
    #[local]
    struct Local {
        main_loop: MainLoop<'static, Board>,
        clock: MonoClock,
        adc: BatteryAdc,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        /*
            This patch enables the debugger to behave correctly during a WFI
            See Errata: https://www.st.com/content/ccc/resource/technical/document/errata_sheet/c3/6b/f8/32/fc/01/48/6e/DM00155929.pdf/files/DM00155929.pdf/jcr:content/translations/en.DM00155929.pdf#%5B%7B%22num%22%3A37%2C%22gen%22%3A0%7D%2C%7B%22name%22%3A%22XYZ%22%7D%2C67%2C724%2Cnull%5D
            See Also Github: https://github.com/probe-rs/probe-rs/issues/350#issuecomment-740550519
        */
        ctx.device.DBGMCU.cr.modify(|_, w| {
            w.dbg_sleep().set_bit();
            w.dbg_standby().set_bit();
            w.dbg_stop().set_bit()
        });
        // enable both dma masters
        ctx.device
            .RCC
            .ahb1enr
            .modify(|_, w| w.dma1en().enabled().dma2en().enabled());

        // Enable RTT logging
        rtt_init_print!();
        log_info!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

        // 8 MHz crystal. APB1 runs at half speed, which doubles its timer clock back to 84 MHz.
        let rcc = ctx.device.RCC.constrain();
        let clocks = rcc
            .cfgr
            .use_hse(8.mhz())
            .sysclk(84.mhz())
            .pclk1(42.mhz())
            .pclk2(84.mhz())
            .freeze();

        /* start RTIC monotonics */
        // DWT cycle counter at the core clock; `MonoClock` widens it past its ~51 s wrap.
        let mut dcb = ctx.core.DCB;
        let dwt = ctx.core.DWT;
        let systick = ctx.core.SYST;
        let mono = DwtSystick::new(&mut dcb, dwt, systick, SYSCLK_HZ);
        /* end RTIC monotonics */

        // obtain a reference to the GPIO* register blocks, so we can configure pins on the P* buses.
        let gpioa = ctx.device.GPIOA.split();
        let gpiob = ctx.device.GPIOB.split();
        let gpioc = ctx.device.GPIOC.split();

        /* serial ports */
        // The HAL sets baud rate and framing and turns on the DMA transmit request. Each TX
        // half goes into a DMA transfer; each RX half stays with the USART interrupt.
        let crsf_pins = (gpiob.pb6.into_alternate::<7>(), gpiob.pb7.into_alternate::<7>());
        let (crsf_tx, crsf_rx) = serial::Serial::new(
            ctx.device.USART1,
            crsf_pins,
            usart::config(CRSF_BAUD.bps()),
            clocks,
        )
        .expect("failed to configure USART1.")
        .split();

        let debug_pins = (gpioa.pa2.into_alternate::<7>(), gpioa.pa3.into_alternate::<7>());
        let (debug_tx, debug_rx) = serial::Serial::new(
            ctx.device.USART2,
            debug_pins,
            usart::config(DEBUG_BAUD.bps()),
            clocks,
        )
        .expect("failed to configure USART2.")
        .split();

        let gnss_pins = (gpioc.pc10.into_alternate::<7>(), gpioc.pc11.into_alternate::<7>());
        let (gnss_tx, gnss_rx) = serial::Serial::new(
            ctx.device.USART3,
            gnss_pins,
            usart::config(GNSS_BAUD.bps()),
            clocks,
        )
        .expect("failed to configure USART3.")
        .split();

        // set up the DMA transfers, one static buffer each
        let dma1_streams: StreamsTuple<DMA1> = StreamsTuple::new(ctx.device.DMA1);
        let dma2_streams: StreamsTuple<DMA2> = StreamsTuple::new(ctx.device.DMA2);
        let crsf_buf = singleton!(: [u8; STAGING] = [0; STAGING]).expect("CRSF buffer taken.");
        let debug_buf = singleton!(: [u8; STAGING] = [0; STAGING]).expect("debug buffer taken.");
        let gnss_buf = singleton!(: [u8; STAGING] = [0; STAGING]).expect("GNSS buffer taken.");
        let crsf_transfer = Transfer::init_memory_to_peripheral(
            dma2_streams.7,
            crsf_tx,
            TxBuffer::new(crsf_buf),
            None,
            usart::dma_config(),
        );
        let debug_transfer = Transfer::init_memory_to_peripheral(
            dma1_streams.6,
            debug_tx,
            TxBuffer::new(debug_buf),
            None,
            usart::dma_config(),
        );
        let gnss_transfer = Transfer::init_memory_to_peripheral(
            dma1_streams.3,
            gnss_tx,
            TxBuffer::new(gnss_buf),
            None,
            usart::dma_config(),
        );

        /* serial engines */
        let (crsf, crsf_irq) = board::CRSF.split().expect("CRSF engine split twice.");
        let (debug, debug_irq) = board::DEBUG.split().expect("debug engine split twice.");
        let (gnss_port, gnss_irq) = board::GNSS.split().expect("GNSS engine split twice.");
        // the engines arm receive in bring-up, so the hardware has to be in place first
        crsf_irq.hardware().attach(crsf_transfer, crsf_rx);
        debug_irq.hardware().attach(debug_transfer, debug_rx);
        gnss_irq.hardware().attach(gnss_transfer, gnss_rx);

        /* servo outputs */
        let tim1_pins = (
            gpioa.pa8.into_alternate::<1>(),
            gpioa.pa9.into_alternate::<1>(),
            gpioa.pa10.into_alternate::<1>(),
            gpioa.pa11.into_alternate::<1>(),
        );
        let tim2_pins = (gpioa.pa0.into_alternate::<1>(), gpioa.pa1.into_alternate::<1>());
        let tim3_pins = (
            gpioa.pa6.into_alternate::<2>(),
            gpioa.pa7.into_alternate::<2>(),
            gpiob.pb0.into_alternate::<2>(),
            gpiob.pb1.into_alternate::<2>(),
        );
        let servos = board::servo::outputs(
            ctx.device.TIM1,
            ctx.device.TIM2,
            ctx.device.TIM3,
            (tim1_pins, tim2_pins, tim3_pins),
            &clocks,
        );

        /* battery ADC */
        let vbat = gpioc.pc0.into_analog();
        let ibat = gpioc.pc1.into_analog();
        let mut adc = BatteryAdc::new(ctx.device.ADC1, &vbat, &ibat);
        adc.start();

        let peripherals: Peripherals<Board> = Peripherals {
            crsf,
            debug,
            gnss_port,
            link: CrsfLink::new(),
            gnss: UbxGnss::new(),
            baro: NoBarometer,
            servos,
        };
        let controller = Controller::new(peripherals, &board::ADC_READING, 0);
        // bring-up happens in idle, where blocking on the GNSS handshake is allowed
        let main_loop = MainLoop::new(controller, 0);

        // lastly return the shared and local resources, in the shape RTIC expects.
        (
            Shared {
                crsf_irq,
                debug_irq,
                gnss_irq,
            },
            Local {
                main_loop,
                clock: MonoClock::new(),
                adc,
            },
            init::Monotonics(mono),
        )
    }

    #[idle(local = [main_loop, clock])]
    fn idle(ctx: idle::Context) -> ! {
        crate::tasks::run_main_loop(ctx.local.main_loop, ctx.local.clock)
    }

    /* bring externed tasks into scope */
    use crate::tasks::{
        on_adc, on_dma1_stream3, on_dma1_stream6, on_dma2_stream7, on_usart1, on_usart2,
        on_usart3,
    };

    // RTIC docs specify we can modularize the code by using these `extern` blocks.
    // This allows us to specify the tasks in other modules and still work within
    // RTIC's infrastructure.
    extern "Rust" {
        // CRSF receiver. Highest priority: a byte arrives every 24 us at 420 kbaud.
        #[task(binds = USART1, priority = 2, shared = [crsf_irq])]
        fn on_usart1(context: on_usart1::Context);

        // CRSF telemetry transfer complete
        #[task(binds = DMA2_STREAM7, priority = 2, shared = [crsf_irq])]
        fn on_dma2_stream7(context: on_dma2_stream7::Context);

        // debug console
        #[task(binds = USART2, priority = 2, shared = [debug_irq])]
        fn on_usart2(context: on_usart2::Context);

        // debug console transfer complete
        #[task(binds = DMA1_STREAM6, priority = 2, shared = [debug_irq])]
        fn on_dma1_stream6(context: on_dma1_stream6::Context);

        // GNSS receiver
        #[task(binds = USART3, priority = 2, shared = [gnss_irq])]
        fn on_usart3(context: on_usart3::Context);

        // GNSS configuration transfer complete
        #[task(binds = DMA1_STREAM3, priority = 2, shared = [gnss_irq])]
        fn on_dma1_stream3(context: on_dma1_stream3::Context);

        // end of each battery conversion
        #[task(binds = ADC, priority = 1, local = [adc])]
        fn on_adc(context: on_adc::Context);
    }
}
