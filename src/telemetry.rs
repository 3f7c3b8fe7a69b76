//! Downlink telemetry: what goes out, and in which order.
//!
//! Only one telemetry frame is queued per telemetry tick. [`Carousel`] picks which one, cycling
//! through every slot in a fixed order whether or not its data changed.

use heapless::Vec;

/// CRSF frame types used for downlink telemetry.
pub mod frame_type {
    pub const VARIO: u8 = 0x07;
    pub const BARO_ALTITUDE: u8 = 0x09;
    pub const CELLS: u8 = 0x0E;
}

/// Largest telemetry payload built here.
pub const MAX_PAYLOAD: usize = 8;

/// Address byte that opens every frame sent towards the receiver.
pub const SYNC_BYTE: u8 = 0xC8;

/// Longest CRSF frame on the wire.
pub const MAX_FRAME: usize = 64;

/// Round-robin slot selector.
#[derive(Debug, Default)]
pub struct Carousel<const SLOTS: usize> {
    next: usize,
    turns: u32,
}

impl<const SLOTS: usize> Carousel<SLOTS> {
    pub const fn new() -> Self {
        Self { next: 0, turns: 0 }
    }

    /// Returns the slot to service now and moves on to the following one.
    pub fn advance(&mut self) -> usize {
        let slot = self.next;
        self.next = (self.next + 1) % SLOTS;
        self.turns = self.turns.wrapping_add(1);
        slot
    }

    /// Slot the next `advance` will return.
    pub fn peek(&self) -> usize {
        self.next
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }
}

/// The four downlink values, in carousel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetrySlot {
    BatteryVoltage,
    BatteryCurrent,
    Altitude,
    Vario,
}

impl TelemetrySlot {
    pub const ORDER: [TelemetrySlot; 4] = [
        TelemetrySlot::BatteryVoltage,
        TelemetrySlot::BatteryCurrent,
        TelemetrySlot::Altitude,
        TelemetrySlot::Vario,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ORDER.get(index).copied()
    }
}

/// Frame type and payload ready to hand to the RC link for framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryFrame {
    pub frame_type: u8,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

impl TelemetryFrame {
    fn new(frame_type: u8, bytes: &[u8]) -> Self {
        let mut payload = Vec::new();
        // every builder below stays within MAX_PAYLOAD
        let _ = payload.extend_from_slice(bytes);
        Self {
            frame_type,
            payload,
        }
    }
}

/// Values sampled for the downlink.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryValues {
    pub battery_voltage_v: f32,
    pub battery_current_a: f32,
    /// height above the take-off point
    pub altitude_agl_m: f32,
    pub vertical_speed_m_s: f32,
}

/// Builds the frame for `slot`.
pub fn build(slot: TelemetrySlot, values: &TelemetryValues) -> TelemetryFrame {
    match slot {
        TelemetrySlot::BatteryVoltage => cell_sensor(1, values.battery_voltage_v),
        // the receiver has no current sensor slot here, so current rides on cell 2
        TelemetrySlot::BatteryCurrent => cell_sensor(2, values.battery_current_a),
        TelemetrySlot::Altitude => baro_altitude(values.altitude_agl_m),
        TelemetrySlot::Vario => vario(values.vertical_speed_m_s),
    }
}

/// Cell sensor frame: cell id then thousandths, big endian. Negative values are sent as 0.
pub fn cell_sensor(cell: u8, value: f32) -> TelemetryFrame {
    let milli = (value.max(0.0) * 1000.0) as u16;
    let be = milli.to_be_bytes();
    TelemetryFrame::new(frame_type::CELLS, &[cell, be[0], be[1]])
}

/// Barometric altitude in decimetres, offset by 10000 dm. Only the altitude field is sent.
pub fn baro_altitude(altitude_m: f32) -> TelemetryFrame {
    let encoded = (altitude_m * 10.0 + 10_000.0) as u16;
    TelemetryFrame::new(frame_type::BARO_ALTITUDE, &encoded.to_be_bytes())
}

/// Vertical speed in cm/s.
pub fn vario(vertical_speed_m_s: f32) -> TelemetryFrame {
    let encoded = (vertical_speed_m_s * 100.0) as i16;
    TelemetryFrame::new(frame_type::VARIO, &encoded.to_be_bytes())
}

/// Wraps a payload into a complete CRSF frame: address, length, type, payload, CRC.
///
/// The length byte counts type, payload and CRC. `None` when the payload cannot fit.
pub fn encode_frame(frame_type: u8, payload: &[u8]) -> Option<Vec<u8, MAX_FRAME>> {
    if payload.len() + 4 > MAX_FRAME {
        return None;
    }
    let mut frame = Vec::new();
    frame.push(SYNC_BYTE).ok()?;
    frame.push(payload.len() as u8 + 2).ok()?;
    frame.push(frame_type).ok()?;
    frame.extend_from_slice(payload).ok()?;
    let crc = crc8_dvb_s2(&frame[2..]);
    frame.push(crc).ok()?;
    Some(frame)
}

/// CRC-8/DVB-S2 (polynomial 0xD5), as CRSF uses over type and payload.
pub fn crc8_dvb_s2(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0xD5
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carousel_visits_slots_in_order() {
        let mut carousel = Carousel::<4>::new();
        let visited: std::vec::Vec<usize> = (0..6).map(|_| carousel.advance()).collect();
        assert_eq!(visited, [0, 1, 2, 3, 0, 1]);
        assert_eq!(carousel.peek(), 2);
        assert_eq!(carousel.turns(), 6);
    }

    #[test]
    fn test_cell_sensor_encoding() {
        let frame = cell_sensor(1, 12.6);
        assert_eq!(frame.frame_type, frame_type::CELLS);
        // 12600 mV
        assert_eq!(&frame.payload[..], &[1, 0x31, 0x38]);
    }

    #[test]
    fn test_negative_battery_values_clamp_to_zero() {
        let values = TelemetryValues {
            battery_current_a: -0.015,
            ..Default::default()
        };
        let frame = build(TelemetrySlot::BatteryCurrent, &values);
        assert_eq!(&frame.payload[..], &[2, 0, 0]);
    }

    #[test]
    fn test_baro_altitude_offset() {
        let frame = baro_altitude(12.5);
        assert_eq!(frame.frame_type, frame_type::BARO_ALTITUDE);
        assert_eq!(&frame.payload[..], &10_125u16.to_be_bytes());
        assert_eq!(&baro_altitude(0.0).payload[..], &10_000u16.to_be_bytes());
    }

    #[test]
    fn test_crc8_check_value() {
        assert_eq!(crc8_dvb_s2(b"123456789"), 0xBC);
    }

    #[test]
    fn test_frame_layout() {
        let cells = cell_sensor(1, 12.6);
        let frame = encode_frame(cells.frame_type, &cells.payload).unwrap();
        assert_eq!(frame[0], SYNC_BYTE);
        // type + 3 payload bytes + crc
        assert_eq!(frame[1], 5);
        assert_eq!(frame[2], frame_type::CELLS);
        assert_eq!(&frame[3..6], &[1, 0x31, 0x38]);
        assert_eq!(frame[6], crc8_dvb_s2(&frame[2..6]));
        assert_eq!(frame.len(), 7);
    }

    #[test]
    fn test_oversized_payload_is_refused() {
        assert!(encode_frame(frame_type::VARIO, &[0; 60]).is_some());
        assert!(encode_frame(frame_type::VARIO, &[0; 61]).is_none());
    }

    #[test]
    fn test_vario_is_signed_centimetres() {
        let frame = vario(-1.5);
        assert_eq!(frame.frame_type, frame_type::VARIO);
        assert_eq!(&frame.payload[..], &(-150i16).to_be_bytes());
    }
}
