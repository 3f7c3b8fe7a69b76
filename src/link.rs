//! RC link supervision.
//!
//! Some receivers stop clocking out frames after a line glitch leaves the UART in an error
//! state. When the decoder has reported no link for `threshold_ms`, the receive path is
//! restarted, and again every `threshold_ms` for as long as the link stays down.

use crate::datamodel::error::Error;
use crate::serial::SerialPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
}

/// Outcome of one supervision tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// link reported up
    Up,
    /// first down sample after being up
    Lost,
    /// still down, not long enough to act
    Down,
    /// down for the threshold; the receive path was restarted
    Stalled { restarts: u32 },
}

impl LinkEvent {
    /// The error this tick represents, if any. Recovery has already run.
    pub fn error(&self) -> Option<Error> {
        match self {
            LinkEvent::Stalled { .. } => Some(Error::LinkStalled),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct LinkSupervisor {
    threshold_ms: u32,
    state: LinkState,
    last_up_ms: Option<u32>,
    /// start of the current silence, or of the last restart
    stall_since_ms: u32,
    restart_count: u32,
}

impl LinkSupervisor {
    /// Starts out `Down`, counting silence from `now_ms`.
    pub fn new(threshold_ms: u32, now_ms: u32) -> Self {
        Self {
            threshold_ms,
            state: LinkState::Down,
            last_up_ms: None,
            stall_since_ms: now_ms,
            restart_count: 0,
        }
    }

    /// Feeds one link sample. Restarts `port`'s receive path when the link has been down for
    /// the threshold since it was lost or since the previous restart.
    ///
    /// Loss is timed from the first down sample, not from [`last_up_ms`](Self::last_up_ms).
    /// If ticks are slow enough that the first down sample already lands a threshold or more
    /// after the last up one, the first restart still waits a further full threshold.
    pub fn poll<P: SerialPort>(&mut self, link_up: bool, now_ms: u32, port: &mut P) -> LinkEvent {
        if link_up {
            self.state = LinkState::Up;
            self.last_up_ms = Some(now_ms);
            return LinkEvent::Up;
        }

        let mut event = LinkEvent::Down;
        if self.state == LinkState::Up {
            self.state = LinkState::Down;
            self.stall_since_ms = now_ms;
            event = LinkEvent::Lost;
        }

        if now_ms.wrapping_sub(self.stall_since_ms) >= self.threshold_ms {
            port.restart_rx();
            self.restart_count = self.restart_count.wrapping_add(1);
            self.stall_since_ms = now_ms;
            event = LinkEvent::Stalled {
                restarts: self.restart_count,
            };
        }
        event
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_up(&self) -> bool {
        self.state == LinkState::Up
    }

    /// When the link was last seen up, if ever.
    pub fn last_up_ms(&self) -> Option<u32> {
        self.last_up_ms
    }

    /// Receive restarts since boot.
    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockUart;
    use crate::serial::Engine;

    #[test]
    fn test_restarts_are_debounced_to_threshold() {
        let engine: Engine<MockUart, 16, 16, 4> = Engine::new(MockUart::new());
        let (mut port, _irq) = engine.split().unwrap();
        port.init();
        let mut supervisor = LinkSupervisor::new(10, 0);

        assert_eq!(supervisor.poll(true, 0, &mut port), LinkEvent::Up);
        let mut restarts_at = std::vec::Vec::new();
        for t in 1..=50 {
            if let LinkEvent::Stalled { .. } = supervisor.poll(false, t, &mut port) {
                restarts_at.push(t);
            }
        }
        assert_eq!(restarts_at, [11, 21, 31, 41]);
        assert_eq!(supervisor.restart_count(), 4);
        assert_eq!(supervisor.last_up_ms(), Some(0));
        assert_eq!(supervisor.state(), LinkState::Down);
    }

    #[test]
    fn test_link_up_clears_pending_stall() {
        let engine: Engine<MockUart, 16, 16, 4> = Engine::new(MockUart::new());
        let (mut port, _irq) = engine.split().unwrap();
        port.init();
        let mut supervisor = LinkSupervisor::new(10, 0);

        supervisor.poll(true, 0, &mut port);
        assert_eq!(supervisor.poll(false, 5, &mut port), LinkEvent::Lost);
        assert_eq!(supervisor.poll(true, 9, &mut port), LinkEvent::Up);
        assert_eq!(supervisor.poll(false, 12, &mut port), LinkEvent::Lost);
        assert_eq!(supervisor.poll(false, 21, &mut port), LinkEvent::Down);
        assert_eq!(
            supervisor.poll(false, 22, &mut port),
            LinkEvent::Stalled { restarts: 1 }
        );
    }

    #[test]
    fn test_late_first_down_sample_waits_a_full_threshold() {
        let engine: Engine<MockUart, 16, 16, 4> = Engine::new(MockUart::new());
        let (mut port, _irq) = engine.split().unwrap();
        port.init();
        let mut supervisor = LinkSupervisor::new(10, 0);

        supervisor.poll(true, 0, &mut port);
        // already 15 ms past the last up sample, but loss only starts counting here
        assert_eq!(supervisor.poll(false, 15, &mut port), LinkEvent::Lost);
        assert_eq!(supervisor.poll(false, 24, &mut port), LinkEvent::Down);
        assert_eq!(
            supervisor.poll(false, 25, &mut port),
            LinkEvent::Stalled { restarts: 1 }
        );
        assert_eq!(supervisor.last_up_ms(), Some(0));
    }

    #[test]
    fn test_boot_without_link_restarts_after_threshold() {
        let engine: Engine<MockUart, 16, 16, 4> = Engine::new(MockUart::new());
        let (mut port, _irq) = engine.split().unwrap();
        port.init();
        let arms_after_init = engine.hardware().receive_arms();
        let mut supervisor = LinkSupervisor::new(10, 100);

        assert_eq!(supervisor.poll(false, 109, &mut port), LinkEvent::Down);
        let event = supervisor.poll(false, 110, &mut port);
        assert_eq!(event, LinkEvent::Stalled { restarts: 1 });
        assert_eq!(event.error(), Some(Error::LinkStalled));
        // restart arms receive twice
        assert_eq!(engine.hardware().receive_arms(), arms_after_init + 2);
    }
}
