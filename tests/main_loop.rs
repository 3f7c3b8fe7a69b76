use crsf_pwm_firmware::config::SERVO_CHANNELS;
use crsf_pwm_firmware::controller::{Controller, MainLoop, Peripherals};
use crsf_pwm_firmware::platform::mock::{
    MockBaro, MockClock, MockGnss, MockPlatform, MockRcLink, MockServo, MockUart,
};
use crsf_pwm_firmware::platform::traits::{AdcReading, Clock, GnssFix, ServoChannel};
use crsf_pwm_firmware::serial::{CrsfEngine, DebugEngine, Engine, GnssEngine, IrqPort};
use crsf_pwm_firmware::telemetry::frame_type;

fn servos() -> [MockServo; SERVO_CHANNELS] {
    core::array::from_fn(|_| {
        let mut servo = MockServo::new();
        // between pulses
        servo.set_counter(5000);
        servo
    })
}

fn drain<const RX: usize, const TX: usize, const CHUNK: usize>(
    engine: &Engine<MockUart, RX, TX, CHUNK>,
    irq: &mut IrqPort<'_, MockUart, RX, TX, CHUNK>,
) {
    for _ in 0..1000 {
        if engine.is_idle_tx() {
            return;
        }
        irq.on_transmit_complete();
    }
    panic!("transmit never went idle");
}

struct Engines {
    crsf: CrsfEngine<MockUart>,
    debug: DebugEngine<MockUart>,
    gnss: GnssEngine<MockUart>,
}

impl Engines {
    fn new() -> Self {
        Self {
            crsf: Engine::new(MockUart::new()),
            debug: Engine::new(MockUart::new()),
            gnss: Engine::new(MockUart::new()),
        }
    }
}

#[test]
fn test_boot_reports_gnss_and_arms_every_port() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, _debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, _gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss: MockGnss::new(true),
        baro: MockBaro::new(120.0),
        servos: servos(),
    };
    let mut controller = Controller::new(peripherals, &adc, 0);
    let clock = MockClock::ticking(0, 1);
    let report = controller.begin(&clock);

    assert!(report.gnss);
    assert!(controller.is_gnss_ready());
    for engine_arms in [
        engines.crsf.hardware().receive_arms(),
        engines.debug.hardware().receive_arms(),
        engines.gnss.hardware().receive_arms(),
    ] {
        assert_eq!(engine_arms, 2);
    }
    // nothing completes transmits here, so the banner flush gives up
    assert!(engines
        .debug
        .hardware()
        .transmitted()
        .starts_with(b"crsf_pwm_firm"));
    assert_eq!(engines.debug.stats().flush_timeouts, 1);
}

#[test]
fn test_telemetry_rotates_through_every_slot() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, _debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, _gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss: MockGnss::new(false),
        baro: MockBaro::new(50.0),
        servos: servos(),
    };
    let mut controller = Controller::new(peripherals, &adc, 0);
    controller.begin(&MockClock::ticking(0, 1));
    let mut main_loop = MainLoop::new(controller, 1000);

    let period = main_loop.scheduler().task("telemetry").unwrap().period_ms();
    for k in 1..=6 {
        main_loop.step(1000 + k * period);
    }

    let frames = main_loop.controller().link().frames();
    let types: Vec<u8> = frames.iter().map(|f| f.frame_type).collect();
    assert_eq!(
        types,
        [
            frame_type::CELLS,
            frame_type::CELLS,
            frame_type::BARO_ALTITUDE,
            frame_type::VARIO,
            frame_type::CELLS,
            frame_type::CELLS,
        ]
    );
    assert_eq!(frames[0].payload[0], 1);
    assert_eq!(frames[1].payload[0], 2);
    assert_eq!(frames[4].payload[0], 1);
    assert_eq!(main_loop.controller().carousel().peek(), 2);
}

#[test]
fn test_servos_follow_link_once_enabled() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, _debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, _gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss: MockGnss::new(false),
        baro: MockBaro::new(0.0),
        servos: servos(),
    };
    let controller = Controller::new(peripherals, &adc, 0);
    let mut main_loop = MainLoop::new(controller, 0);

    // registers follow the channels even before the outputs are switched on
    main_loop.step(1);
    assert!(!main_loop.controller().servos().is_enabled());
    assert_eq!(main_loop.controller().servos().channels()[0].compare(), 1500);

    let link = main_loop.controller_mut().link_mut();
    link.set_link_up(true);
    link.set_channel(1, 1700);
    link.set_channel(3, 2500);
    main_loop
        .controller_mut()
        .servos_mut()
        .channels_mut()[1]
        .set_counter(100);

    main_loop.step(2);
    let servos = main_loop.controller().servos();
    assert!(servos.is_enabled());
    assert_eq!(servos.channels()[0].compare(), 1500);

    main_loop.step(3);
    let servos = main_loop.controller().servos();
    assert_eq!(servos.channels()[0].compare(), 1700);
    // mid-pulse, left alone
    assert_eq!(servos.channels()[1].compare(), 1500);
    assert_eq!(servos.channels()[2].compare(), 2250);
    assert_eq!(servos.channels()[3].compare(), 1500);
}

#[test]
fn test_silent_link_restarts_receive_every_threshold() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, _debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, _gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss: MockGnss::new(false),
        baro: MockBaro::new(0.0),
        servos: servos(),
    };
    let mut controller = Controller::new(peripherals, &adc, 0);
    controller.crsf_port_mut().init();
    let mut main_loop = MainLoop::new(controller, 0);

    for now in 1..=50 {
        main_loop.step(now);
    }

    assert_eq!(main_loop.controller().supervisor().restart_count(), 5);
    // two arms at init, two per restart
    assert_eq!(engines.crsf.hardware().receive_arms(), 12);
    assert_eq!(main_loop.controller().loops(), 50);
}

#[test]
fn test_status_line_on_debug_port() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, mut debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, _gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss: MockGnss::new(false),
        baro: MockBaro::new(0.0),
        servos: servos(),
    };
    let mut controller = Controller::new(peripherals, &adc, 0);
    controller.crsf_port_mut().init();
    controller.debug_port_mut().init();
    let mut main_loop = MainLoop::new(controller, 0);

    main_loop.step(200);
    drain(&engines.debug, &mut debug_irq);

    let sent = engines.debug.hardware().transmitted();
    let line = core::str::from_utf8(&sent).unwrap();
    assert!(
        line.starts_with(r#"{"loops":0,"link_up":false,"ch1":1500,"ch2":1500,"restarts":1,"#),
        "{}",
        line
    );
    assert!(line.contains(r#""battery_v":"#));
    assert!(line.ends_with("}\r\n"));
    assert_eq!(line.matches('\n').count(), 1);
}

#[test]
fn test_adc_sample_feeds_battery_telemetry() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, _debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, _gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss: MockGnss::new(false),
        baro: MockBaro::new(0.0),
        servos: servos(),
    };
    let controller = Controller::new(peripherals, &adc, 0);
    let mut main_loop = MainLoop::new(controller, 0);

    assert_eq!(main_loop.controller().telemetry_values().battery_voltage_v, 0.0);
    adc.publish(60_000, 4_000, 1);
    main_loop.step(1);
    assert!(main_loop.controller().telemetry_values().battery_voltage_v > 0.0);

    adc.publish(60_000, 4_000, 11);
    main_loop.step(12);
    assert_eq!(main_loop.controller().battery().period_ms(), 10);
}

#[test]
fn test_gnss_polled_only_when_it_answered_at_boot() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, _debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, mut gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let mut gnss = MockGnss::new(true);
    gnss.set_fix(GnssFix {
        latitude: 337_000_000,
        longitude: -1_176_000_000,
        satellites: 9,
        ..GnssFix::default()
    });
    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss,
        baro: MockBaro::new(0.0),
        servos: servos(),
    };
    let mut controller = Controller::new(peripherals, &adc, 0);
    controller.begin(&MockClock::ticking(0, 1));
    let mut main_loop = MainLoop::new(controller, 0);

    gnss_irq.on_receive_complete(&[0xB5, 0x62, 0x01, 0x07], Default::default());
    main_loop.step(100);

    let gnss = main_loop.controller_mut().gnss_mut();
    assert_eq!(gnss.updates(), 1);
    assert_eq!(gnss.bytes_seen(), 4);
}

#[test]
fn test_failed_barometer_keeps_last_altitude() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, _debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, _gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss: MockGnss::new(false),
        baro: MockBaro::new(80.0),
        servos: servos(),
    };
    let controller = Controller::new(peripherals, &adc, 0);
    let mut main_loop = MainLoop::new(controller, 0);

    main_loop.step(125);
    let before = main_loop.controller().altitude().reading();
    assert_eq!(before.altitude_asl_m, 80.0);

    main_loop.controller_mut().baro_mut().set_altitude(None);
    main_loop.step(250);
    assert_eq!(main_loop.controller().altitude().reading(), before);
}

#[test]
fn test_begin_restarts_schedule_after_bring_up() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, _debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, _gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss: MockGnss::new(false),
        baro: MockBaro::new(0.0),
        servos: servos(),
    };
    let controller = Controller::new(peripherals, &adc, 0);
    let mut main_loop = MainLoop::new(controller, 0);

    let clock = MockClock::ticking(0, 1);
    let report = main_loop.begin(&clock);
    assert!(!report.gnss);

    // the reading taken by begin is the one just before this
    let booted_at = clock.now_ms() - 1;
    // the banner flush alone waits this long
    assert!(booted_at >= 50);
    for task in main_loop.scheduler().tasks() {
        assert_eq!(task.last_run_ms(), booted_at, "{}", task.name());
        assert_eq!(task.runs(), 0);
    }
    assert_eq!(main_loop.controller().supervisor().restart_count(), 0);
}

#[test]
fn test_refused_telemetry_goes_out_without_another_write() {
    let engines = Engines::new();
    let (crsf, _crsf_irq) = engines.crsf.split().unwrap();
    let (debug, _debug_irq) = engines.debug.split().unwrap();
    let (gnss_port, _gnss_irq) = engines.gnss.split().unwrap();
    let adc = AdcReading::new();

    let peripherals: Peripherals<MockPlatform> = Peripherals {
        crsf,
        debug,
        gnss_port,
        link: MockRcLink::new(),
        gnss: MockGnss::new(false),
        baro: MockBaro::new(0.0),
        servos: servos(),
    };
    let mut controller = Controller::new(peripherals, &adc, 0);
    controller.crsf_port_mut().init();
    let mut main_loop = MainLoop::new(controller, 0);

    // the telemetry write and the retry on the same tick are both refused
    engines.crsf.hardware().refuse_transmits(2);
    main_loop.step(125);
    assert_eq!(main_loop.controller().link().frames().len(), 1);
    assert_eq!(engines.crsf.hardware().transmit_count(), 0);
    assert_eq!(engines.crsf.stats().tx_refused, 2);

    // nothing new is written on the next tick, the queued frame still leaves
    main_loop.step(126);
    assert_eq!(main_loop.controller().link().frames().len(), 1);
    assert_eq!(engines.crsf.hardware().transmit_count(), 1);
    assert_eq!(engines.crsf.hardware().transmitted()[0], frame_type::CELLS);
}
