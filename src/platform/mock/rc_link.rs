use heapless::Vec;

use crate::datamodel::error::Error;
use crate::platform::traits::{ByteStream, RcLink};

/// One telemetry frame handed to [`MockRcLink::queue_packet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFrame {
    pub frame_type: u8,
    pub payload: Vec<u8, 16>,
}

/// RC decoder stand-in: link state and channels are set by the test.
///
/// Queued frames go out on the stream as `[frame_type, payload..]` and are also recorded.
#[derive(Debug)]
pub struct MockRcLink {
    link_up: bool,
    channels: [u16; 16],
    updates: u32,
    bytes_seen: usize,
    frames: Vec<QueuedFrame, 32>,
}

impl MockRcLink {
    pub fn new() -> Self {
        Self {
            link_up: false,
            channels: [1500; 16],
            updates: 0,
            bytes_seen: 0,
            frames: Vec::new(),
        }
    }

    pub fn set_link_up(&mut self, up: bool) {
        self.link_up = up;
    }

    /// Sets 1-based `channel` to `value_us`.
    pub fn set_channel(&mut self, channel: usize, value_us: u16) {
        if let Some(slot) = channel.checked_sub(1).and_then(|i| self.channels.get_mut(i)) {
            *slot = value_us;
        }
    }

    pub fn updates(&self) -> u32 {
        self.updates
    }

    pub fn bytes_seen(&self) -> usize {
        self.bytes_seen
    }

    pub fn frames(&self) -> &[QueuedFrame] {
        &self.frames
    }
}

impl Default for MockRcLink {
    fn default() -> Self {
        Self::new()
    }
}

impl RcLink for MockRcLink {
    fn update<S: ByteStream>(&mut self, stream: &mut S, _now_ms: u32) {
        self.updates += 1;
        while stream.read_byte().is_some() {
            self.bytes_seen += 1;
        }
    }

    fn is_link_up(&self) -> bool {
        self.link_up
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
        let mut frame: Vec<u8, 17> = Vec::new();
        let _ = frame.push(frame_type);
        frame
            .extend_from_slice(payload)
            .map_err(|_| Error::ResourceExhausted { written: 0 })?;
        if stream.write_space() < frame.len() {
            return Err(Error::ResourceExhausted { written: 0 });
        }
        match stream.write(&frame) {
            // queued in full, the engine retries the transmit
            Ok(_) | Err(Error::HardwareBusy) => {}
            Err(e) => return Err(e),
        }
        let mut recorded = Vec::new();
        let _ = recorded.extend_from_slice(payload);
        let _ = self.frames.push(QueuedFrame {
            frame_type,
            payload: recorded,
        });
        Ok(())
    }
}
