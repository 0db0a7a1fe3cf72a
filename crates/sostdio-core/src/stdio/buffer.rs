//! Stream buffer state.
//!
//! One fixed-capacity byte array shared by both directions. The buffer is
//! in exactly one of three modes at a time:
//!
//! - `Idle`: nothing buffered.
//! - `Reading`: `data[..filled]` is the last block fetched from the OS and
//!   `pos` marks the next byte to deliver.
//! - `Writing`: `data[..filled]` holds dirty bytes not yet handed to the
//!   OS; `pos` stays at 0.
//!
//! Invariant: `pos <= filled <= data.len()`, and `data.len()` never
//! changes after allocation.

/// Which direction currently owns the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IoMode {
    #[default]
    Idle,
    Reading,
    Writing,
}

#[derive(Debug)]
pub struct StreamBuffer {
    data: Vec<u8>,
    /// Next byte to deliver (reading only).
    pos: usize,
    /// Valid bytes: read-ahead when reading, dirty bytes when writing.
    filled: usize,
    mode: IoMode,
}

impl StreamBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes (at least 1).
    ///
    /// Returns `None` if the allocation cannot be satisfied.
    pub fn try_new(capacity: usize) -> Option<Self> {
        let cap = capacity.max(1);
        let mut data = Vec::new();
        data.try_reserve_exact(cap).ok()?;
        data.resize(cap, 0);
        Some(Self {
            data,
            pos: 0,
            filled: 0,
            mode: IoMode::Idle,
        })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Valid bytes in the buffer.
    pub fn count(&self) -> usize {
        self.filled
    }

    /// Read cursor within the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn mode(&self) -> IoMode {
        self.mode
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    /// Deliver the next buffered byte, if any remain.
    pub fn next_byte(&mut self) -> Option<u8> {
        if self.mode != IoMode::Reading || self.pos >= self.filled {
            return None;
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Some(b)
    }

    /// Buffered bytes fetched but not yet delivered.
    pub fn readable(&self) -> usize {
        match self.mode {
            IoMode::Reading => self.filled - self.pos,
            _ => 0,
        }
    }

    /// The whole buffer, as the destination of a fill.
    pub fn fill_target(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Record that a fill placed `n` bytes at the start of the buffer.
    pub fn commit_fill(&mut self, n: usize) {
        debug_assert!(n > 0 && n <= self.data.len());
        self.filled = n.min(self.data.len());
        self.pos = 0;
        self.mode = IoMode::Reading;
    }

    // -----------------------------------------------------------------------
    // Write side
    // -----------------------------------------------------------------------

    /// Whether another byte can be stored without flushing.
    pub fn is_full(&self) -> bool {
        self.filled == self.data.len()
    }

    /// Append one dirty byte. The caller drains a full buffer first.
    pub fn push(&mut self, byte: u8) {
        debug_assert!(!self.is_full());
        self.data[self.filled] = byte;
        self.filled += 1;
        self.pos = 0;
        self.mode = IoMode::Writing;
    }

    /// Dirty bytes awaiting a flush.
    pub fn pending_write_data(&self) -> &[u8] {
        match self.mode {
            IoMode::Writing => &self.data[..self.filled],
            _ => &[],
        }
    }

    /// Discard everything and return to `Idle`. The storage is zeroed so
    /// stale bytes are never re-flushed or re-delivered.
    pub fn reset(&mut self) {
        self.data[..self.filled].fill(0);
        self.pos = 0;
        self.filled = 0;
        self.mode = IoMode::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_bounds(buf: &StreamBuffer) {
        assert!(buf.position() <= buf.count());
        assert!(buf.count() <= buf.capacity());
    }

    #[test]
    fn new_buffer_is_idle_and_empty() {
        let buf = StreamBuffer::try_new(crate::config::DEFAULT_BUFSIZE).unwrap();
        assert_eq!(buf.capacity(), 4096);
        assert_eq!(buf.mode(), IoMode::Idle);
        assert_eq!(buf.count(), 0);
        assert!(buf.pending_write_data().is_empty());
    }

    #[test]
    fn zero_capacity_rounds_up_to_one() {
        let buf = StreamBuffer::try_new(0).unwrap();
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn impossible_allocation_is_reported() {
        assert!(StreamBuffer::try_new(usize::MAX).is_none());
    }

    #[test]
    fn read_side_delivers_committed_fill() {
        let mut buf = StreamBuffer::try_new(8).unwrap();
        assert_eq!(buf.next_byte(), None);
        buf.fill_target()[..3].copy_from_slice(b"abc");
        buf.commit_fill(3);
        assert_eq!(buf.mode(), IoMode::Reading);
        assert_eq!(buf.next_byte(), Some(b'a'));
        assert_eq!(buf.readable(), 2);
        assert_eq!(buf.next_byte(), Some(b'b'));
        assert_eq!(buf.next_byte(), Some(b'c'));
        assert_eq!(buf.next_byte(), None);
        check_bounds(&buf);
    }

    #[test]
    fn write_side_accumulates_until_full() {
        let mut buf = StreamBuffer::try_new(3).unwrap();
        buf.push(b'x');
        buf.push(b'y');
        assert!(!buf.is_full());
        buf.push(b'z');
        assert!(buf.is_full());
        assert_eq!(buf.pending_write_data(), b"xyz");
        assert_eq!(buf.mode(), IoMode::Writing);
        check_bounds(&buf);
    }

    #[test]
    #[should_panic]
    fn push_into_full_buffer_is_a_bug() {
        let mut buf = StreamBuffer::try_new(1).unwrap();
        buf.push(b'a');
        buf.push(b'b');
    }

    #[test]
    fn reset_clears_contents_and_mode() {
        let mut buf = StreamBuffer::try_new(4).unwrap();
        buf.push(b'q');
        buf.reset();
        assert_eq!(buf.mode(), IoMode::Idle);
        assert_eq!(buf.count(), 0);
        assert!(buf.fill_target().iter().all(|&b| b == 0));
    }

    #[test]
    fn read_ahead_is_not_pending_write_data() {
        let mut buf = StreamBuffer::try_new(4).unwrap();
        buf.fill_target()[..2].copy_from_slice(b"hi");
        buf.commit_fill(2);
        assert!(buf.pending_write_data().is_empty());
    }
}
