use super::ByteStream;
use crate::datamodel::error::Error;

/// RC receiver protocol decoder sitting on top of a byte stream.
pub trait RcLink {
    /// Pulls every byte waiting on `stream` and decodes what it can.
    fn update<S: ByteStream>(&mut self, stream: &mut S, now_ms: u32);

    /// True while the receiver reports a live link to the transmitter.
    fn is_link_up(&self) -> bool;

    /// Decoded channel value in microseconds. Channels are numbered from 1.
    fn channel(&self, channel: usize) -> u16;

    /// Frames `payload` as a `frame_type` telemetry packet and queues it on `stream`.
    ///
    /// Frames are all or nothing: when the stream lacks room nothing is written.
    fn queue_packet<S: ByteStream>(
        &mut self,
        stream: &mut S,
        frame_type: u8,
        payload: &[u8],
    ) -> Result<(), Error>;
}
