//! u-blox receiver spoken to in UBX.
//!
//! Bring-up asks for a 2 Hz NAV-PVT stream and waits for the module to answer; after that
//! every NAV-PVT frame that streams in replaces the cached fix.

use heapless::Vec;

use crate::config::GNSS_MEASUREMENT_PERIOD_MS;
use crate::platform::traits::{ByteStream, Clock, Gnss, GnssFix};

const SYNC_1: u8 = 0xB5;
const SYNC_2: u8 = 0x62;

pub mod class {
    pub const NAV: u8 = 0x01;
    pub const ACK: u8 = 0x05;
    pub const CFG: u8 = 0x06;
}

pub mod id {
    pub const NAV_PVT: u8 = 0x07;
    pub const ACK_NAK: u8 = 0x00;
    pub const ACK_ACK: u8 = 0x01;
    pub const CFG_MSG: u8 = 0x01;
    pub const CFG_RATE: u8 = 0x08;
}

/// NAV-PVT payload length, the longest payload kept.
pub const NAV_PVT_LEN: usize = 92;

/// Sync, class, id, length and checksum around the payload.
pub const MAX_FRAME: usize = NAV_PVT_LEN + 8;

/// A frame that passed its checksum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    NavPvt(GnssFix),
    Ack { class: u8, id: u8 },
    Nak { class: u8, id: u8 },
    Other { class: u8, id: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Sync1,
    Sync2,
    Class,
    Id,
    Length1,
    Length2,
    Payload,
    ChecksumA,
    ChecksumB,
}

/// Byte-at-a-time UBX frame decoder.
#[derive(Debug)]
pub struct Parser {
    state: State,
    class: u8,
    id: u8,
    length: usize,
    received: usize,
    payload: Vec<u8, NAV_PVT_LEN>,
    ck_a: u8,
    ck_b: u8,
    rx_ck_a: u8,
    checksum_errors: u32,
}

impl Parser {
    pub const fn new() -> Self {
        Self {
            state: State::Sync1,
            class: 0,
            id: 0,
            length: 0,
            received: 0,
            payload: Vec::new(),
            ck_a: 0,
            ck_b: 0,
            rx_ck_a: 0,
            checksum_errors: 0,
        }
    }

    /// Feeds one byte. Returns a message when this byte completed a valid frame.
    pub fn push(&mut self, byte: u8) -> Option<Message> {
        match self.state {
            State::Sync1 => {
                if byte == SYNC_1 {
                    self.state = State::Sync2;
                }
            }
            State::Sync2 => {
                self.state = match byte {
                    SYNC_2 => State::Class,
                    SYNC_1 => State::Sync2,
                    _ => State::Sync1,
                };
            }
            State::Class => {
                self.ck_a = 0;
                self.ck_b = 0;
                self.checksum(byte);
                self.class = byte;
                self.state = State::Id;
            }
            State::Id => {
                self.checksum(byte);
                self.id = byte;
                self.state = State::Length1;
            }
            State::Length1 => {
                self.checksum(byte);
                self.length = byte as usize;
                self.state = State::Length2;
            }
            State::Length2 => {
                self.checksum(byte);
                self.length |= (byte as usize) << 8;
                self.received = 0;
                self.payload.clear();
                self.state = if self.length == 0 {
                    State::ChecksumA
                } else {
                    State::Payload
                };
            }
            State::Payload => {
                self.checksum(byte);
                // longer payloads are checksummed but not kept
                let _ = self.payload.push(byte);
                self.received += 1;
                if self.received == self.length {
                    self.state = State::ChecksumA;
                }
            }
            State::ChecksumA => {
                self.rx_ck_a = byte;
                self.state = State::ChecksumB;
            }
            State::ChecksumB => {
                self.state = State::Sync1;
                if self.rx_ck_a != self.ck_a || byte != self.ck_b {
                    self.checksum_errors = self.checksum_errors.wrapping_add(1);
                    return None;
                }
                return Some(self.decode());
            }
        }
        None
    }

    /// Frames dropped for a bad checksum.
    pub fn checksum_errors(&self) -> u32 {
        self.checksum_errors
    }

    fn checksum(&mut self, byte: u8) {
        self.ck_a = self.ck_a.wrapping_add(byte);
        self.ck_b = self.ck_b.wrapping_add(self.ck_a);
    }

    fn decode(&self) -> Message {
        let p = &self.payload[..];
        match (self.class, self.id) {
            (class::NAV, id::NAV_PVT) if self.length == NAV_PVT_LEN => Message::NavPvt(GnssFix {
                satellites: p[23],
                longitude: le_i32(p, 24),
                latitude: le_i32(p, 28),
                altitude_msl_mm: le_i32(p, 36),
                ground_speed_mm_s: le_i32(p, 60),
                heading: le_i32(p, 64),
            }),
            (class::ACK, id::ACK_ACK) if p.len() >= 2 => Message::Ack {
                class: p[0],
                id: p[1],
            },
            (class::ACK, id::ACK_NAK) if p.len() >= 2 => Message::Nak {
                class: p[0],
                id: p[1],
            },
            (class, id) => Message::Other { class, id },
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn le_i32(p: &[u8], offset: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&p[offset..offset + 4]);
    i32::from_le_bytes(bytes)
}

/// Builds a complete UBX frame. `None` when the payload does not fit [`MAX_FRAME`].
pub fn encode(class: u8, id: u8, payload: &[u8]) -> Option<Vec<u8, MAX_FRAME>> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&[SYNC_1, SYNC_2, class, id]).ok()?;
    frame
        .extend_from_slice(&(payload.len() as u16).to_le_bytes())
        .ok()?;
    frame.extend_from_slice(payload).ok()?;

    let (mut ck_a, mut ck_b) = (0u8, 0u8);
    for &byte in &frame[2..] {
        ck_a = ck_a.wrapping_add(byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    frame.push(ck_a).ok()?;
    frame.push(ck_b).ok()?;
    Some(frame)
}

/// u-blox module on a serial port.
#[derive(Debug, Default)]
pub struct UbxGnss {
    parser: Parser,
    fix: GnssFix,
    solutions: u32,
    last_solution_ms: Option<u32>,
}

impl UbxGnss {
    pub const fn new() -> Self {
        Self {
            parser: Parser::new(),
            fix: GnssFix {
                latitude: 0,
                longitude: 0,
                altitude_msl_mm: 0,
                ground_speed_mm_s: 0,
                heading: 0,
                satellites: 0,
            },
            solutions: 0,
            last_solution_ms: None,
        }
    }

    /// NAV-PVT frames decoded since boot.
    pub fn solutions(&self) -> u32 {
        self.solutions
    }

    pub fn last_solution_ms(&self) -> Option<u32> {
        self.last_solution_ms
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    fn accept(&mut self, message: Message, now_ms: u32) {
        if let Message::NavPvt(fix) = message {
            self.fix = fix;
            self.solutions = self.solutions.wrapping_add(1);
            self.last_solution_ms = Some(now_ms);
        }
    }
}

impl Gnss for UbxGnss {
    /// Sends the rate and NAV-PVT configuration, then waits for any valid frame back.
    fn begin<S: ByteStream, C: Clock>(&mut self, port: &mut S, clock: &C, timeout_ms: u32) -> bool {
        let period = GNSS_MEASUREMENT_PERIOD_MS.to_le_bytes();
        // one navigation solution per measurement, aligned to GPS time
        let set_rate = [period[0], period[1], 1, 0, 1, 0];
        let enable_pvt = [class::NAV, id::NAV_PVT, 1];
        for (msg, payload) in [(id::CFG_RATE, &set_rate[..]), (id::CFG_MSG, &enable_pvt[..])] {
            let Some(frame) = encode(class::CFG, msg, payload) else {
                continue;
            };
            if let Err(e) = port.write(&frame) {
                log_warn!("GNSS config 0x{:02x} not sent: {}", msg, e);
            }
        }

        let start = clock.now_ms();
        loop {
            let now = clock.now_ms();
            if now.wrapping_sub(start) >= timeout_ms {
                return false;
            }
            let Some(byte) = port.read_byte() else {
                core::hint::spin_loop();
                continue;
            };
            match self.parser.push(byte) {
                Some(Message::Nak { class, id }) => {
                    log_warn!("GNSS rejected 0x{:02x}/0x{:02x}", class, id);
                    return true;
                }
                Some(message) => {
                    self.accept(message, now);
                    return true;
                }
                None => {}
            }
        }
    }

    fn update<S: ByteStream>(&mut self, port: &mut S, now_ms: u32) {
        let mut buf = [0u8; 32];
        loop {
            let n = port.read(&mut buf);
            if n == 0 {
                break;
            }
            for &byte in &buf[..n] {
                if let Some(message) = self.parser.push(byte) {
                    self.accept(message, now_ms);
                }
            }
        }
    }

    fn fix(&self) -> GnssFix {
        self.fix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{MockClock, MockUart};
    use crate::platform::traits::RxFlags;
    use crate::serial::{Engine, GnssEngine};

    fn nav_pvt(lat: i32, lon: i32, satellites: u8) -> Vec<u8, MAX_FRAME> {
        let mut payload = [0u8; NAV_PVT_LEN];
        payload[23] = satellites;
        payload[24..28].copy_from_slice(&lon.to_le_bytes());
        payload[28..32].copy_from_slice(&lat.to_le_bytes());
        payload[36..40].copy_from_slice(&152_300i32.to_le_bytes());
        payload[60..64].copy_from_slice(&1_250i32.to_le_bytes());
        payload[64..68].copy_from_slice(&9_000_000i32.to_le_bytes());
        encode(class::NAV, id::NAV_PVT, &payload).unwrap()
    }

    fn feed(parser: &mut Parser, bytes: &[u8]) -> std::vec::Vec<Message> {
        bytes.iter().filter_map(|&b| parser.push(b)).collect()
    }

    #[test]
    fn test_nav_pvt_is_decoded() {
        let mut parser = Parser::new();
        let frame = nav_pvt(337_123_456, -1_176_543_210, 11);
        let messages = feed(&mut parser, &frame);
        assert_eq!(
            messages,
            [Message::NavPvt(GnssFix {
                latitude: 337_123_456,
                longitude: -1_176_543_210,
                altitude_msl_mm: 152_300,
                ground_speed_mm_s: 1_250,
                heading: 9_000_000,
                satellites: 11,
            })]
        );
    }

    #[test]
    fn test_bad_checksum_is_dropped_and_parser_resyncs() {
        let mut parser = Parser::new();
        let mut corrupt = nav_pvt(1, 2, 3);
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;

        assert!(feed(&mut parser, &corrupt).is_empty());
        assert_eq!(parser.checksum_errors(), 1);

        let mut stream = std::vec::Vec::from(&b"\x00\xB5\xB5\x62"[..]);
        stream.extend_from_slice(&nav_pvt(1, 2, 3)[2..]);
        assert_eq!(feed(&mut parser, &stream).len(), 1);
    }

    #[test]
    fn test_ack_and_nak() {
        let mut parser = Parser::new();
        let ack = encode(class::ACK, id::ACK_ACK, &[class::CFG, id::CFG_RATE]).unwrap();
        let nak = encode(class::ACK, id::ACK_NAK, &[class::CFG, id::CFG_MSG]).unwrap();
        assert_eq!(
            feed(&mut parser, &ack),
            [Message::Ack {
                class: class::CFG,
                id: id::CFG_RATE
            }]
        );
        assert_eq!(
            feed(&mut parser, &nak),
            [Message::Nak {
                class: class::CFG,
                id: id::CFG_MSG
            }]
        );
    }

    #[test]
    fn test_begin_configures_and_waits_for_answer() {
        let engine: GnssEngine<MockUart> = Engine::new(MockUart::new());
        let (mut port, mut irq) = engine.split().unwrap();
        port.init();
        let ack = encode(class::ACK, id::ACK_ACK, &[class::CFG, id::CFG_RATE]).unwrap();
        irq.on_receive_complete(&ack, RxFlags::NONE);

        let mut gnss = UbxGnss::new();
        assert!(gnss.begin(&mut port, &MockClock::ticking(0, 1), 1000));
        assert_eq!(
            &engine.hardware().transmitted()[..4],
            &[SYNC_1, SYNC_2, class::CFG, id::CFG_RATE]
        );
    }

    #[test]
    fn test_begin_gives_up_on_silent_module() {
        let engine: GnssEngine<MockUart> = Engine::new(MockUart::new());
        let (mut port, _irq) = engine.split().unwrap();
        port.init();

        let mut gnss = UbxGnss::new();
        assert!(!gnss.begin(&mut port, &MockClock::ticking(0, 1), 50));
    }

    #[test]
    fn test_update_decodes_frames_split_across_calls() {
        let engine: GnssEngine<MockUart> = Engine::new(MockUart::new());
        let (mut port, mut irq) = engine.split().unwrap();
        port.init();
        let mut gnss = UbxGnss::new();
        let frame = nav_pvt(10, 20, 6);

        irq.on_receive_complete(&frame[..40], RxFlags::NONE);
        gnss.update(&mut port, 100);
        assert_eq!(gnss.solutions(), 0);
        assert!(!gnss.fix().is_valid());

        irq.on_receive_complete(&frame[40..], RxFlags::NONE);
        gnss.update(&mut port, 200);
        assert_eq!(gnss.solutions(), 1);
        assert_eq!(gnss.last_solution_ms(), Some(200));
        assert_eq!(gnss.fix().latitude, 10);
        assert!(gnss.fix().is_valid());
    }
}
