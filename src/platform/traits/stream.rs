use crate::datamodel::error::Error;

/// Non-blocking byte stream, the one interface protocol code needs from a transport.
pub trait ByteStream {
    /// Bytes ready to read.
    fn available(&self) -> usize;

    /// Reads up to `buf.len()` bytes; 0 when nothing is waiting.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte) {
            0 => None,
            _ => Some(byte[0]),
        }
    }

    /// Queues `bytes` for transmission.
    ///
    /// A write that does not fit queues what it can and reports
    /// `Error::ResourceExhausted { written }`.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Error>;

    /// Bytes that can be written right now without a partial write.
    fn write_space(&self) -> usize;
}
