use crate::platform::traits::{ByteStream, Clock, Gnss, GnssFix};

/// GNSS receiver stand-in that consumes its port and reports a preset fix.
#[derive(Debug, Default)]
pub struct MockGnss {
    fix: GnssFix,
    answers: bool,
    begin_calls: u32,
    updates: u32,
    bytes_seen: usize,
}

impl MockGnss {
    /// `answers` decides whether `begin` succeeds.
    pub fn new(answers: bool) -> Self {
        Self {
            answers,
            ..Self::default()
        }
    }

    pub fn set_fix(&mut self, fix: GnssFix) {
        self.fix = fix;
    }

    pub fn begin_calls(&self) -> u32 {
        self.begin_calls
    }

    pub fn updates(&self) -> u32 {
        self.updates
    }

    /// Bytes drained from the port by `update`.
    pub fn bytes_seen(&self) -> usize {
        self.bytes_seen
    }
}

impl Gnss for MockGnss {
    fn begin<S: ByteStream, C: Clock>(
        &mut self,
        _port: &mut S,
        _clock: &C,
        _timeout_ms: u32,
    ) -> bool {
        self.begin_calls += 1;
        self.answers
    }

    fn update<S: ByteStream>(&mut self, port: &mut S, _now_ms: u32) {
        self.updates += 1;
        let mut buf = [0u8; 32];
        loop {
            let n = port.read(&mut buf);
            if n == 0 {
                break;
            }
            self.bytes_seen += n;
        }
    }

    fn fix(&self) -> GnssFix {
        self.fix
    }
}
