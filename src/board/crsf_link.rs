//! CRSF receiver link.
//!
//! Inbound frames go through the `crsf` crate's reader; telemetry goes out through
//! [`telemetry::encode_frame`].

use crsf::{Config, LinkStatistics, Packet, PacketReader, RcChannelsPacked};
use crsf_pwm_firmware::config::CRSF_FAILSAFE_MS;
use crsf_pwm_firmware::platform::traits::{ByteStream, RcLink};
use crsf_pwm_firmware::{log_debug, telemetry, Error};

const CHANNELS: usize = 16;
/// Raw value a centred stick reports.
const RAW_CENTER: i32 = 992;
const READ_CHUNK: usize = 64;

/// 11-bit CRSF value to microseconds, 172..1811 onto 988..2012.
fn raw_to_us(raw: u16) -> u16 {
    ((raw as i32 - RAW_CENTER) * 5 / 8 + 1500) as u16
}

pub struct CrsfLink {
    reader: PacketReader,
    channels: [u16; CHANNELS],
    /// Time of the last channels frame, `None` until the first one.
    last_channels_ms: Option<u32>,
    now_ms: u32,
    /// Uplink quality from the last link statistics frame, percent.
    link_quality: Option<u8>,
    bad_frames: u32,
}

impl CrsfLink {
    pub fn new() -> Self {
        Self {
            reader: PacketReader::new(Config::default()),
            channels: [1500; CHANNELS],
            last_channels_ms: None,
            now_ms: 0,
            link_quality: None,
            bad_frames: 0,
        }
    }
}

impl RcLink for CrsfLink {
    fn update<S: ByteStream>(&mut self, stream: &mut S, now_ms: u32) {
        self.now_ms = now_ms;
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = stream.read(&mut buf);
            if n == 0 {
                break;
            }
            for result in self.reader.iter_packets(&buf[..n]) {
                match result {
                    Ok(Packet::RcChannelsPacked(RcChannelsPacked(raw))) => {
                        for (out, &value) in self.channels.iter_mut().zip(raw.iter()) {
                            *out = raw_to_us(value);
                        }
                        self.last_channels_ms = Some(now_ms);
                    }
                    Ok(Packet::LinkStatistics(LinkStatistics {
                        uplink_link_quality,
                        ..
                    })) => {
                        self.link_quality = Some(uplink_link_quality);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.bad_frames = self.bad_frames.wrapping_add(1);
                        log_debug!("crsf: dropped frame {}: {:?}", self.bad_frames, e);
                    }
                }
            }
        }
    }

    fn is_link_up(&self) -> bool {
        // receivers that keep sending channels in failsafe report zero link quality
        if self.link_quality == Some(0) {
            return false;
        }
        match self.last_channels_ms {
            Some(at) => self.now_ms.wrapping_sub(at) < CRSF_FAILSAFE_MS,
            None => false,
        }
    }

    fn channel(&self, channel: usize) -> u16 {
        channel
            .checked_sub(1)
            .and_then(|i| self.channels.get(i))
            .copied()
            .unwrap_or(0)
    }

    fn queue_packet<S: ByteStream>(
        &mut self,
        stream: &mut S,
        frame_type: u8,
        payload: &[u8],
    ) -> Result<(), Error> {
        let frame = telemetry::encode_frame(frame_type, payload)
            .ok_or(Error::ResourceExhausted { written: 0 })?;
        if stream.write_space() < frame.len() {
            return Err(Error::ResourceExhausted { written: 0 });
        }
        match stream.write(&frame) {
            // fully queued, the engine retries the transmit on its own
            Ok(_) | Err(Error::HardwareBusy) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
