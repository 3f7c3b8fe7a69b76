//! The flight peripheral's main loop: shared state plus the task table that drives it.
//!
//! [`Controller::begin`] runs once before the loop and is the only place allowed to block.
//! After that, [`MainLoop::step`] is called as fast as the idle loop spins.

use core::fmt::Write as _;

use serde::Serialize;

use crate::actuator::{ServoOutputs, ServoUpdate};
use crate::config::{
    ServoConfig, ALTITUDE_PERIOD_MS, BATTERY_PERIOD_MS, BOOT_FLUSH_TIMEOUT_MS,
    DEBUG_REPORT_PERIOD_MS, GNSS_BEGIN_TIMEOUT_MS, GNSS_REPORT_PERIOD_MS, GNSS_UPDATE_PERIOD_MS,
    LINK_STALL_THRESHOLD_MS, LINK_WATCHDOG_PERIOD_MS, QNH_HPA, RC_INTAKE_PERIOD_MS,
    SERIAL_RETRY_PERIOD_MS, SERVO_CHANNELS, SERVO_UPDATE_PERIOD_MS, TELEMETRY_PERIOD_MS,
    TELEMETRY_SLOTS,
};
use crate::datamodel::error::Error;
use crate::datamodel::status::{BootReport, GnssReport, StatusReport};
use crate::link::{LinkEvent, LinkSupervisor};
use crate::platform::traits::{
    AdcReading, Barometer, ByteStream, Clock, Gnss, Platform, RcLink,
};
use crate::scheduler::{Scheduler, Task};
use crate::sensors::{AltitudeFilter, BatteryMonitor};
use crate::serial::SerialPort;
use crate::telemetry::{self, Carousel, TelemetrySlot, TelemetryValues};

/// Longest JSON report line, terminator included.
pub const REPORT_LINE_MAX: usize = 256;

/// Number of entries in [`task_table`].
pub const TASK_COUNT: usize = 10;

/// Peripherals handed over to the controller at boot.
pub struct Peripherals<P: Platform> {
    pub crsf: P::CrsfPort,
    pub debug: P::DebugPort,
    pub gnss_port: P::GnssPort,
    pub link: P::RcLink,
    pub gnss: P::Gnss,
    pub baro: P::Barometer,
    pub servos: [P::Servo; SERVO_CHANNELS],
}

/// Everything the scheduled tasks share.
pub struct Controller<'a, P: Platform> {
    crsf: P::CrsfPort,
    debug: P::DebugPort,
    gnss_port: P::GnssPort,
    link: P::RcLink,
    gnss: P::Gnss,
    baro: P::Barometer,
    servos: ServoOutputs<P::Servo, SERVO_CHANNELS>,
    supervisor: LinkSupervisor,
    adc: &'a AdcReading,
    battery: BatteryMonitor,
    altitude: AltitudeFilter,
    carousel: Carousel<TELEMETRY_SLOTS>,
    gnss_ready: bool,
    loops: u32,
    dropped_reports: u32,
}

impl<'a, P: Platform> Controller<'a, P> {
    pub fn new(peripherals: Peripherals<P>, adc: &'a AdcReading, now_ms: u32) -> Self {
        Self {
            crsf: peripherals.crsf,
            debug: peripherals.debug,
            gnss_port: peripherals.gnss_port,
            link: peripherals.link,
            gnss: peripherals.gnss,
            baro: peripherals.baro,
            servos: ServoOutputs::new(peripherals.servos, ServoConfig::default()),
            supervisor: LinkSupervisor::new(LINK_STALL_THRESHOLD_MS, now_ms),
            adc,
            battery: BatteryMonitor::new(),
            altitude: AltitudeFilter::new(ALTITUDE_PERIOD_MS),
            carousel: Carousel::new(),
            gnss_ready: false,
            loops: 0,
            dropped_reports: 0,
        }
    }

    /// One-time bring-up. Blocks for at most the GNSS handshake plus the banner flush.
    pub fn begin<C: Clock>(&mut self, clock: &C) -> BootReport {
        self.crsf.init();
        self.debug.init();
        self.gnss_port.init();

        let _ = write!(
            self.debug,
            "{} {}\r\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );

        self.gnss_ready = self
            .gnss
            .begin(&mut self.gnss_port, clock, GNSS_BEGIN_TIMEOUT_MS);
        if self.gnss_ready {
            log_info!("GNSS module answered");
        } else {
            log_warn!("GNSS module silent, running without it");
        }

        let report = BootReport {
            gnss: self.gnss_ready,
        };
        self.emit(&report);
        if let Err(e) = self.debug.flush(clock, BOOT_FLUSH_TIMEOUT_MS) {
            log_warn!("boot banner: {}", e);
        }

        // silence is counted from the end of bring-up, not from power-on
        self.supervisor = LinkSupervisor::new(LINK_STALL_THRESHOLD_MS, clock.now_ms());
        report
    }

    /* scheduled tasks, in table order */

    /// Feeds received bytes to the RC decoder.
    pub fn rc_intake(&mut self, now_ms: u32) {
        self.link.update(&mut self.crsf, now_ms);
    }

    /// Restarts the RC receive path after sustained silence.
    pub fn link_watchdog(&mut self, now_ms: u32) {
        let up = self.link.is_link_up();
        match self.supervisor.poll(up, now_ms, &mut self.crsf) {
            LinkEvent::Lost => log_warn!("RC link lost at {} ms", now_ms),
            event @ LinkEvent::Stalled { restarts } => {
                if let Some(e) = event.error() {
                    log_debug!("{} (#{})", e, restarts);
                }
            }
            LinkEvent::Up | LinkEvent::Down => {}
        }
    }

    pub fn servo_update(&mut self, _now_ms: u32) {
        if self.servos.update(&self.link) == ServoUpdate::Enabled {
            log_info!("RC link up, servo outputs enabled");
        }
    }

    /// Filters the latest ADC conversion, if one finished since the last run.
    pub fn battery_sample(&mut self, _now_ms: u32) {
        if let Some((voltage_raw, current_raw, completed_at_ms)) = self.adc.take() {
            self.battery.update(voltage_raw, current_raw, completed_at_ms);
        }
    }

    pub fn gnss_update(&mut self, now_ms: u32) {
        if self.gnss_ready {
            self.gnss.update(&mut self.gnss_port, now_ms);
        }
    }

    /// Samples the barometer. A failed read keeps the previous altitude.
    pub fn altitude_sample(&mut self, _now_ms: u32) {
        match self.baro.sample(QNH_HPA) {
            Some(sample) => {
                self.altitude.update(sample);
            }
            None => log_debug!("barometer read failed"),
        }
    }

    pub fn debug_report(&mut self, _now_ms: u32) {
        let stats = self.crsf.stats();
        let report = StatusReport {
            loops: self.loops,
            link_up: self.link.is_link_up(),
            ch1: self.link.channel(1),
            ch2: self.link.channel(2),
            restarts: self.supervisor.restart_count(),
            adc_period: self.battery.period_ms(),
            rx_overruns: stats.rx_overruns,
            rx_dropped: stats.rx_dropped,
            battery_v: self.battery.reading().voltage_v,
            altitude_m: self.altitude.reading().altitude_agl_m,
        };
        self.emit(&report);
    }

    pub fn gnss_report(&mut self, _now_ms: u32) {
        if !self.gnss_ready {
            return;
        }
        let solution = self.gnss.fix();
        let report = GnssReport {
            ready: self.gnss_ready,
            fix: solution.is_valid(),
            solution,
        };
        self.emit(&report);
    }

    /// Queues the next telemetry frame in the rotation. A full TX ring skips this slot.
    pub fn telemetry(&mut self, _now_ms: u32) {
        let slot = self.carousel.advance();
        let Some(slot) = TelemetrySlot::from_index(slot) else {
            return;
        };
        let frame = telemetry::build(slot, &self.telemetry_values());
        if let Err(e) = self
            .link
            .queue_packet(&mut self.crsf, frame.frame_type, &frame.payload)
        {
            log_debug!("telemetry {:?} skipped: {}", slot, e);
        }
    }

    /// Restarts transmits the UARTs refused earlier, so queued bytes never wait for the next
    /// write on their port.
    pub fn serial_retry(&mut self, _now_ms: u32) {
        // a refusal keeps the bytes queued and is logged by the port
        let _ = self.crsf.kick();
        let _ = self.debug.kick();
        let _ = self.gnss_port.kick();
    }

    /* state */

    pub fn telemetry_values(&self) -> TelemetryValues {
        let battery = self.battery.reading();
        let altitude = self.altitude.reading();
        TelemetryValues {
            battery_voltage_v: battery.voltage_v.max(0.0),
            battery_current_a: battery.current_a.max(0.0),
            altitude_agl_m: altitude.altitude_agl_m,
            vertical_speed_m_s: altitude.vertical_speed_m_s,
        }
    }

    pub fn loops(&self) -> u32 {
        self.loops
    }

    pub fn supervisor(&self) -> &LinkSupervisor {
        &self.supervisor
    }

    pub fn servos(&self) -> &ServoOutputs<P::Servo, SERVO_CHANNELS> {
        &self.servos
    }

    pub fn servos_mut(&mut self) -> &mut ServoOutputs<P::Servo, SERVO_CHANNELS> {
        &mut self.servos
    }

    pub fn link(&self) -> &P::RcLink {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut P::RcLink {
        &mut self.link
    }

    pub fn baro_mut(&mut self) -> &mut P::Barometer {
        &mut self.baro
    }

    pub fn gnss_mut(&mut self) -> &mut P::Gnss {
        &mut self.gnss
    }

    pub fn battery(&self) -> &BatteryMonitor {
        &self.battery
    }

    pub fn altitude(&self) -> &AltitudeFilter {
        &self.altitude
    }

    pub fn carousel(&self) -> &Carousel<TELEMETRY_SLOTS> {
        &self.carousel
    }

    pub fn is_gnss_ready(&self) -> bool {
        self.gnss_ready
    }

    /// Report lines dropped because the debug port was full.
    pub fn dropped_reports(&self) -> u32 {
        self.dropped_reports
    }

    pub fn crsf_port_mut(&mut self) -> &mut P::CrsfPort {
        &mut self.crsf
    }

    pub fn debug_port_mut(&mut self) -> &mut P::DebugPort {
        &mut self.debug
    }

    pub fn gnss_port_mut(&mut self) -> &mut P::GnssPort {
        &mut self.gnss_port
    }

    fn emit<T: Serialize>(&mut self, report: &T) {
        if !send_json_line(&mut self.debug, report) {
            self.dropped_reports = self.dropped_reports.wrapping_add(1);
        }
    }
}

/// Serializes `value` as a single `\r\n` terminated JSON line on `port`.
///
/// The line is only queued if it fits whole, so a busy port drops reports instead of
/// interleaving half-lines. Returns whether the line was queued.
pub fn send_json_line<T: Serialize, S: ByteStream>(port: &mut S, value: &T) -> bool {
    let mut line = [0u8; REPORT_LINE_MAX];
    let len = match serde_json_core::to_slice(value, &mut line[..REPORT_LINE_MAX - 2]) {
        Ok(len) => len,
        Err(e) => {
            log_error!("report does not fit a line: {:?}", e);
            return false;
        }
    };
    line[len..len + 2].copy_from_slice(b"\r\n");
    if port.write_space() < len + 2 {
        return false;
    }
    match port.write(&line[..len + 2]) {
        // HardwareBusy still queued the line
        Ok(_) | Err(Error::HardwareBusy) => true,
        Err(_) => false,
    }
}

/// The schedule, highest priority first.
pub fn task_table<'a, P: Platform>() -> [Task<Controller<'a, P>>; TASK_COUNT] {
    [
        Task::new("rc_intake", RC_INTAKE_PERIOD_MS, Controller::<'a, P>::rc_intake),
        Task::new("link_watchdog", LINK_WATCHDOG_PERIOD_MS, Controller::<'a, P>::link_watchdog),
        Task::new("servo_update", SERVO_UPDATE_PERIOD_MS, Controller::<'a, P>::servo_update),
        Task::new("battery_sample", BATTERY_PERIOD_MS, Controller::<'a, P>::battery_sample),
        Task::new("gnss_update", GNSS_UPDATE_PERIOD_MS, Controller::<'a, P>::gnss_update),
        Task::new("altitude_sample", ALTITUDE_PERIOD_MS, Controller::<'a, P>::altitude_sample),
        Task::new("debug_report", DEBUG_REPORT_PERIOD_MS, Controller::<'a, P>::debug_report),
        Task::new("gnss_report", GNSS_REPORT_PERIOD_MS, Controller::<'a, P>::gnss_report),
        Task::new("telemetry", TELEMETRY_PERIOD_MS, Controller::<'a, P>::telemetry),
        Task::new("serial_retry", SERIAL_RETRY_PERIOD_MS, Controller::<'a, P>::serial_retry),
    ]
}

/// Controller plus its schedule; one [`MainLoop::step`] is one tick.
pub struct MainLoop<'a, P: Platform> {
    controller: Controller<'a, P>,
    scheduler: Scheduler<Controller<'a, P>, TASK_COUNT>,
}

impl<'a, P: Platform> MainLoop<'a, P> {
    /// Task periods are counted from `now_ms`; call after [`Controller::begin`].
    pub fn new(controller: Controller<'a, P>, now_ms: u32) -> Self {
        Self {
            controller,
            scheduler: Scheduler::new(task_table(), now_ms),
        }
    }

    /// Runs [`Controller::begin`] and restarts every task period from the end of bring-up.
    pub fn begin<C: Clock>(&mut self, clock: &C) -> BootReport {
        let report = self.controller.begin(clock);
        self.scheduler = Scheduler::new(task_table(), clock.now_ms());
        report
    }

    pub fn step(&mut self, now_ms: u32) {
        self.scheduler.run(&mut self.controller, now_ms);
        self.controller.loops = self.controller.loops.wrapping_add(1);
    }

    pub fn controller(&self) -> &Controller<'a, P> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller<'a, P> {
        &mut self.controller
    }

    pub fn scheduler(&self) -> &Scheduler<Controller<'a, P>, TASK_COUNT> {
        &self.scheduler
    }
}
