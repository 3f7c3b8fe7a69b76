//! Lock-free single-producer single-consumer byte ring.
//!
//! `head` and `tail` are free-running counters; a counter `c` lives in slot `c % N`. Only the
//! [`Producer`] writes `head` and only the [`Consumer`] writes `tail`, so the two halves can sit
//! in different execution contexts (an interrupt handler and the main loop) without locks.
//!
//! One slot is kept free: a ring of `N` holds at most `N - 1` bytes.
//!
//! Two overflow policies are offered:
//! - [`Producer::push`] / [`Producer::write`] refuse bytes that do not fit.
//! - [`Producer::push_overwrite`] always accepts and lets the consumer lose the oldest byte.
//!   The producer never touches `tail` for this. The consumer notices it has been lapped and
//!   skips ahead on its next read.

use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Fixed-capacity byte ring. `N` must be a power of two, at least 2.
pub struct Ring<const N: usize> {
    /// next counter the producer writes
    head: AtomicUsize,
    /// next counter the consumer reads
    tail: AtomicUsize,
    slots: [AtomicU8; N],
}

impl<const N: usize> Ring<N> {
    /// Number of bytes the ring can hold at once.
    pub const USABLE: usize = N - 1;

    // counters wrap at usize::MAX, so slot indices only stay continuous if N divides 2^BITS
    const CAPACITY_OK: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "ring capacity must be a power of two"
    );

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::CAPACITY_OK;
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicU8 = AtomicU8::new(0);
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            slots: [ZERO; N],
        }
    }

    /// Hands out the two halves. Holding `&mut self` guarantees there is only ever one of each.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        (Producer { ring: self }, Consumer { ring: self })
    }

    /// Bytes currently readable.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail).min(Self::USABLE)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn free_space(&self) -> usize {
        Self::USABLE - self.len()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Producer half over a ring that lives for as long as the handle does.
    ///
    /// Callers must make sure only one producer exists; [`Ring::split`] is the checked way.
    pub(crate) fn producer(&self) -> Producer<'_, N> {
        Producer { ring: self }
    }

    /// See [`Ring::producer`].
    pub(crate) fn consumer(&self) -> Consumer<'_, N> {
        Consumer { ring: self }
    }

    /// Removes the oldest byte, skipping anything the producer has overwritten.
    ///
    /// Only the current `tail` owner may call this.
    pub(crate) fn take(&self) -> Option<u8> {
        loop {
            let head = self.head.load(Ordering::Acquire);
            let mut tail = self.tail.load(Ordering::Relaxed);
            let len = head.wrapping_sub(tail);
            if len == 0 {
                return None;
            }
            if len > Self::USABLE {
                // lapped: only the newest N - 1 bytes are still valid
                tail = head.wrapping_sub(Self::USABLE);
            }
            let byte = self.slots[tail % N].load(Ordering::Acquire);
            // the producer may have reused this slot while we were reading it
            let head_after = self.head.load(Ordering::Acquire);
            if head_after.wrapping_sub(tail) > Self::USABLE {
                continue;
            }
            self.tail.store(tail.wrapping_add(1), Ordering::Release);
            return Some(byte);
        }
    }

    /// Removes up to `buf.len()` bytes. Only the current `tail` owner may call this.
    pub(crate) fn take_into(&self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.take() {
                Some(byte) => *slot = byte,
                None => break,
            }
            count += 1;
        }
        count
    }

    /// Puts bytes that were just taken back in front of the oldest byte, keeping their order.
    ///
    /// Only valid for a refuse-on-overflow ring, directly after [`Ring::take_into`] returned
    /// exactly `bytes`. The producer cannot have reused those slots since it never fills past
    /// `N - 1`.
    pub(crate) fn restore_front(&self, bytes: &[u8]) {
        let mut tail = self.tail.load(Ordering::Relaxed);
        for &byte in bytes.iter().rev() {
            tail = tail.wrapping_sub(1);
            self.slots[tail % N].store(byte, Ordering::Release);
        }
        self.tail.store(tail, Ordering::Release);
    }
}

impl<const N: usize> Default for Ring<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write half: the only writer of `head`.
pub struct Producer<'a, const N: usize> {
    ring: &'a Ring<N>,
}

impl<'a, const N: usize> Producer<'a, N> {
    /// Appends one byte, refusing it when the ring is full.
    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        let head = self.ring.head.load(Ordering::Relaxed);
        let tail = self.ring.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) >= Ring::<N>::USABLE {
            return Err(byte);
        }
        self.ring.slots[head % N].store(byte, Ordering::Release);
        self.ring.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Appends one byte unconditionally. Returns `true` when this pushed the oldest byte out.
    pub fn push_overwrite(&mut self, byte: u8) -> bool {
        let head = self.ring.head.load(Ordering::Relaxed);
        let tail = self.ring.tail.load(Ordering::Acquire);
        let dropped = head.wrapping_sub(tail) >= Ring::<N>::USABLE;
        self.ring.slots[head % N].store(byte, Ordering::Release);
        self.ring.head.store(head.wrapping_add(1), Ordering::Release);
        dropped
    }

    /// Appends as much of `bytes` as fits and returns how much that was.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let head = self.ring.head.load(Ordering::Relaxed);
        let tail = self.ring.tail.load(Ordering::Acquire);
        let free = Ring::<N>::USABLE.saturating_sub(head.wrapping_sub(tail));
        let count = bytes.len().min(free);
        for (offset, &byte) in bytes[..count].iter().enumerate() {
            self.ring.slots[head.wrapping_add(offset) % N].store(byte, Ordering::Release);
        }
        self.ring
            .head
            .store(head.wrapping_add(count), Ordering::Release);
        count
    }

    /// Discards everything buffered by moving `head` back onto `tail`.
    ///
    /// The consumer side must be quiescent, e.g. its hardware transfer aborted.
    pub fn clear(&mut self) {
        let tail = self.ring.tail.load(Ordering::Acquire);
        self.ring.head.store(tail, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn free_space(&self) -> usize {
        self.ring.free_space()
    }
}

/// Read half: the only writer of `tail`.
pub struct Consumer<'a, const N: usize> {
    ring: &'a Ring<N>,
}

impl<'a, const N: usize> Consumer<'a, N> {
    pub fn pop(&mut self) -> Option<u8> {
        self.ring.take()
    }

    /// Fills `buf` from the front of the ring, returning how many bytes were read.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.ring.take_into(buf)
    }

    /// Discards everything buffered by moving `tail` up to `head`.
    pub fn clear(&mut self) {
        let head = self.ring.head.load(Ordering::Acquire);
        self.ring.tail.store(head, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_refuses_when_full() {
        let mut ring = Ring::<4>::new();
        let (mut tx, mut rx) = ring.split();
        assert_eq!(tx.push(1), Ok(()));
        assert_eq!(tx.push(2), Ok(()));
        assert_eq!(tx.push(3), Ok(()));
        assert_eq!(tx.push(4), Err(4));
        assert_eq!(tx.free_space(), 0);
        assert_eq!(rx.pop(), Some(1));
        assert_eq!(tx.push(4), Ok(()));
        assert_eq!(rx.len(), 3);
    }

    #[test]
    fn test_write_is_partial_when_short_of_space() {
        let mut ring = Ring::<8>::new();
        let (mut tx, mut rx) = ring.split();
        assert_eq!(tx.write(&[0; 5]), 5);
        assert_eq!(tx.write(&[1, 2, 3, 4]), 2);
        let mut out = [0u8; 8];
        assert_eq!(rx.read(&mut out), 7);
        assert_eq!(&out[5..7], &[1, 2]);
    }

    #[test]
    fn test_drop_oldest_keeps_newest_bytes() {
        let mut ring = Ring::<8>::new();
        let (mut tx, mut rx) = ring.split();
        let mut dropped = 0;
        for byte in 0..=255u8 {
            if tx.push_overwrite(byte) {
                dropped += 1;
            }
        }
        assert_eq!(dropped, 256 - 7);
        assert_eq!(rx.len(), 7);
        let mut out = [0u8; 16];
        let n = rx.read(&mut out);
        assert_eq!(&out[..n], &[249, 250, 251, 252, 253, 254, 255]);
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_clear_from_consumer_empties() {
        let mut ring = Ring::<8>::new();
        let (mut tx, mut rx) = ring.split();
        tx.write(b"abc");
        rx.clear();
        assert!(rx.is_empty());
        tx.push(b'd').unwrap();
        assert_eq!(rx.pop(), Some(b'd'));
    }

    #[test]
    fn test_clear_from_producer_empties() {
        let mut ring = Ring::<8>::new();
        let (mut tx, rx) = ring.split();
        tx.write(b"abcdef");
        tx.clear();
        assert!(rx.is_empty());
        assert_eq!(tx.free_space(), 7);
    }

    #[test]
    fn test_restore_front_preserves_order() {
        let ring = Ring::<8>::new();
        let mut tx = ring.producer();
        tx.write(b"hello");
        let mut chunk = [0u8; 3];
        assert_eq!(ring.take_into(&mut chunk), 3);
        assert_eq!(&chunk, b"hel");
        ring.restore_front(&chunk);
        let mut out = [0u8; 8];
        let n = ring.take_into(&mut out);
        assert_eq!(&out[..n], b"hello");
    }

    #[test]
    fn test_counters_survive_wraparound() {
        let ring = Ring::<4>::new();
        ring.head.store(usize::MAX - 1, Ordering::Relaxed);
        ring.tail.store(usize::MAX - 1, Ordering::Relaxed);
        let mut tx = ring.producer();
        let mut rx = ring.consumer();
        assert_eq!(tx.write(&[7, 8, 9]), 3);
        assert_eq!(rx.len(), 3);
        assert_eq!(rx.pop(), Some(7));
        assert_eq!(rx.pop(), Some(8));
        assert_eq!(rx.pop(), Some(9));
        assert_eq!(rx.pop(), None);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(u8),
        Overwrite(u8),
        Write(Vec<u8>),
        Pop,
        Read(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u8>().prop_map(Op::Push),
            any::<u8>().prop_map(Op::Overwrite),
            proptest::collection::vec(any::<u8>(), 0..20).prop_map(Op::Write),
            Just(Op::Pop),
            (0usize..20).prop_map(Op::Read),
        ]
    }

    proptest! {
        #[test]
        fn prop_len_plus_free_is_usable_capacity(ops in proptest::collection::vec(op(), 0..200)) {
            let mut ring = Ring::<16>::new();
            let (mut tx, mut rx) = ring.split();
            let mut scratch = [0u8; 32];
            for op in ops {
                match op {
                    Op::Push(b) => { let _ = tx.push(b); }
                    Op::Overwrite(b) => { tx.push_overwrite(b); }
                    Op::Write(bytes) => { tx.write(&bytes); }
                    Op::Pop => { rx.pop(); }
                    Op::Read(n) => { rx.read(&mut scratch[..n]); }
                }
                prop_assert_eq!(tx.len() + tx.free_space(), 15);
                prop_assert!(rx.len() <= 15);
            }
        }

        #[test]
        fn prop_reads_match_a_model_queue(ops in proptest::collection::vec(op(), 0..200)) {
            let mut ring = Ring::<8>::new();
            let (mut tx, mut rx) = ring.split();
            let mut model = std::collections::VecDeque::new();
            let mut scratch = [0u8; 32];
            for op in ops {
                match op {
                    Op::Push(b) => {
                        if tx.push(b).is_ok() { model.push_back(b); }
                    }
                    Op::Overwrite(b) => {
                        tx.push_overwrite(b);
                        model.push_back(b);
                        while model.len() > 7 { model.pop_front(); }
                    }
                    Op::Write(bytes) => {
                        let n = tx.write(&bytes);
                        model.extend(bytes[..n].iter().copied());
                    }
                    Op::Pop => {
                        prop_assert_eq!(rx.pop(), model.pop_front());
                    }
                    Op::Read(n) => {
                        let got = rx.read(&mut scratch[..n]);
                        let expected: Vec<u8> = (0..got).filter_map(|_| model.pop_front()).collect();
                        prop_assert_eq!(&scratch[..got], &expected[..]);
                        prop_assert_eq!(got, n.min(got + model.len()));
                    }
                }
                prop_assert_eq!(rx.len(), model.len());
            }
        }
    }
}
