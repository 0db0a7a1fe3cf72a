//! Stream state management.
//!
//! `Stream` is the safe Rust model of a stdio `FILE`: it owns one raw
//! handle and one fixed buffer, and keeps the logical position consistent
//! with what is buffered. The ABI layer wraps these in a registry and
//! hands out opaque pointers to C callers.
//!
//! Mode switches happen only at flush or seek boundaries:
//! - reading after writing flushes the dirty bytes first;
//! - writing after reading rewinds the OS cursor over the unread
//!   read-ahead so the byte lands at the logical offset.

use std::path::Path;

use super::buffer::{IoMode, StreamBuffer};
use super::error::StdioError;
use crate::config;
use crate::errno;
use crate::metrics::{StdioMetrics, global_metrics};
use crate::os::{FdFile, FileSystem, OsFs, RawFile, Whence};

// ---------------------------------------------------------------------------
// Mode parsing
// ---------------------------------------------------------------------------

/// Access and creation semantics requested by a mode string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub readable: bool,
    pub writable: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub binary: bool,
}

/// Parse an `fopen` mode string.
///
/// Accepted: `r`, `r+`, `w`, `w+`, `a`, `a+`, each optionally carrying one
/// `b` after the first character (`rb`, `r+b`, `rb+`). `w` opens for both
/// reading and writing. Returns `None` for anything else.
pub fn parse_mode(mode: &str) -> Option<OpenFlags> {
    let (&first, rest) = mode.as_bytes().split_first()?;

    let mut flags = match first {
        b'r' => OpenFlags {
            readable: true,
            ..Default::default()
        },
        b'w' => OpenFlags {
            readable: true,
            writable: true,
            create: true,
            truncate: true,
            ..Default::default()
        },
        b'a' => OpenFlags {
            writable: true,
            create: true,
            append: true,
            ..Default::default()
        },
        _ => return None,
    };

    let mut plus = false;
    for &c in rest {
        match c {
            b'+' if !plus => {
                plus = true;
                flags.readable = true;
                flags.writable = true;
            }
            b'b' if !flags.binary => flags.binary = true,
            _ => return None,
        }
    }

    Some(flags)
}

/// Convert open flags to `O_*` flag bits.
pub fn flags_to_oflags(flags: &OpenFlags) -> i32 {
    let mut oflags = if flags.readable && flags.writable {
        libc::O_RDWR
    } else if flags.writable {
        libc::O_WRONLY
    } else {
        libc::O_RDONLY
    };

    if flags.create {
        oflags |= libc::O_CREAT;
    }
    if flags.truncate {
        oflags |= libc::O_TRUNC;
    }
    if flags.append {
        oflags |= libc::O_APPEND;
    }

    oflags
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

/// Latched status indicators.
#[derive(Debug, Clone, Copy, Default)]
struct StreamFlags {
    eof: bool,
    error: bool,
    /// Errno of the failure that latched `error`.
    errno: i32,
}

/// How a flush of dirty bytes ended, when it did not succeed.
enum DrainFailure {
    /// The OS accepted zero bytes.
    Zero,
    /// The OS reported a hard failure.
    Failed(i32),
}

/// A buffered stream over one raw file handle.
#[derive(Debug)]
pub struct Stream<F: RawFile = FdFile> {
    file: F,
    buffer: StreamBuffer,
    open_flags: OpenFlags,
    flags: StreamFlags,
    closed: bool,
}

impl Stream<FdFile> {
    /// Open `path` on the host file system with the configured buffer size.
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self, StdioError> {
        Self::open_in(&OsFs, path, mode, config::buffer_capacity())
    }
}

impl<F: RawFile> Stream<F> {
    /// Open `path` through `fs` with a buffer of `capacity` bytes.
    ///
    /// The mode is validated before anything is acquired. If the buffer
    /// cannot be allocated the freshly acquired handle is released.
    pub fn open_in<S>(
        fs: &S,
        path: impl AsRef<Path>,
        mode: &str,
        capacity: usize,
    ) -> Result<Self, StdioError>
    where
        S: FileSystem<File = F>,
    {
        let open_flags =
            parse_mode(mode).ok_or_else(|| StdioError::InvalidMode(mode.to_string()))?;
        let mut file = fs
            .open(path.as_ref(), &open_flags)
            .map_err(|errno| StdioError::OpenFailed { errno })?;
        let Some(buffer) = StreamBuffer::try_new(capacity) else {
            let _ = file.close();
            return Err(StdioError::OutOfMemory);
        };
        StdioMetrics::inc(&global_metrics().opens);
        Ok(Self {
            file,
            buffer,
            open_flags,
            flags: StreamFlags::default(),
            closed: false,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The raw OS handle, for collaborators that need it directly.
    pub fn native_handle(&self) -> F::Native {
        self.file.native_handle()
    }

    /// Whether the end-of-file indicator is latched.
    pub fn is_eof(&self) -> bool {
        self.flags.eof
    }

    /// Whether the error indicator is latched.
    pub fn is_error(&self) -> bool {
        self.flags.error
    }

    /// Errno of the failure that latched the error indicator, or 0.
    pub fn last_errno(&self) -> i32 {
        self.flags.errno
    }

    pub fn mode(&self) -> IoMode {
        self.buffer.mode()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Valid bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.count()
    }

    /// Read cursor within the buffer.
    pub fn buffer_position(&self) -> usize {
        self.buffer.position()
    }

    // -----------------------------------------------------------------------
    // Byte operations
    // -----------------------------------------------------------------------

    /// Read one byte, refilling the buffer from the OS when it is drained.
    pub fn read_byte(&mut self) -> Result<u8, StdioError> {
        self.check_error()?;
        if self.flags.eof {
            return Err(StdioError::EndOfStream);
        }
        if !self.open_flags.readable {
            return Err(self.latch_error(errno::EBADF));
        }
        if self.buffer.mode() == IoMode::Writing {
            self.flush()?;
        }
        if let Some(b) = self.buffer.next_byte() {
            return Ok(b);
        }
        self.fill()?;
        self.buffer.next_byte().ok_or(StdioError::EndOfStream)
    }

    /// Write one byte, flushing first if the buffer is full.
    ///
    /// If the flush moves zero bytes the end-of-file indicator is latched
    /// and `EndOfStream` is returned; the byte is not stored either way.
    pub fn write_byte(&mut self, byte: u8) -> Result<u8, StdioError> {
        self.check_error()?;
        if !self.open_flags.writable {
            return Err(self.latch_error(errno::EBADF));
        }
        if self.buffer.mode() == IoMode::Reading {
            self.rewind_read_ahead()?;
        }
        if self.buffer.is_full() {
            match self.drain() {
                Ok(()) => {}
                Err(DrainFailure::Zero) => {
                    self.flags.eof = true;
                    return Err(StdioError::EndOfStream);
                }
                Err(DrainFailure::Failed(e)) => return Err(self.latch_error(e)),
            }
        }
        self.buffer.push(byte);
        Ok(byte)
    }

    // -----------------------------------------------------------------------
    // Bulk operations
    // -----------------------------------------------------------------------

    /// Read up to `elem_count` elements of `elem_size` bytes into `dest`.
    ///
    /// Stops at the first end-of-file or error and returns the number of
    /// complete elements delivered. Bytes of a trailing partial element
    /// are still written to `dest`. The request is capped at `dest.len()`.
    /// Inspect [`Stream::is_eof`] / [`Stream::is_error`] to tell a short
    /// count apart.
    pub fn read_items(&mut self, dest: &mut [u8], elem_size: usize, elem_count: usize) -> usize {
        if elem_size == 0 {
            return 0;
        }
        let wanted = elem_size.saturating_mul(elem_count).min(dest.len());
        let mut delivered = 0;
        for slot in &mut dest[..wanted] {
            match self.read_byte() {
                Ok(b) => {
                    *slot = b;
                    delivered += 1;
                }
                Err(_) => break,
            }
        }
        delivered / elem_size
    }

    /// Write up to `elem_count` elements of `elem_size` bytes from `src`.
    ///
    /// Stops at the first failed byte and returns the number of complete
    /// elements accepted. The request is capped at `src.len()`.
    pub fn write_items(&mut self, src: &[u8], elem_size: usize, elem_count: usize) -> usize {
        if elem_size == 0 {
            return 0;
        }
        let wanted = elem_size.saturating_mul(elem_count).min(src.len());
        let mut consumed = 0;
        for &b in &src[..wanted] {
            if self.write_byte(b).is_err() {
                break;
            }
            consumed += 1;
        }
        consumed / elem_size
    }

    // -----------------------------------------------------------------------
    // Flush / position
    // -----------------------------------------------------------------------

    /// Hand pending dirty bytes to the OS.
    ///
    /// Succeeds without I/O when nothing is pending. On failure the error
    /// indicator is latched and the buffer is still discarded, so partial
    /// data is never flushed twice.
    pub fn flush(&mut self) -> Result<(), StdioError> {
        if self.buffer.pending_write_data().is_empty() {
            return Ok(());
        }
        if self.flags.error {
            self.buffer.reset();
            return Err(self.latched());
        }
        match self.drain() {
            Ok(()) => Ok(()),
            Err(DrainFailure::Zero) => Err(self.latch_error(errno::EIO)),
            Err(DrainFailure::Failed(e)) => Err(self.latch_error(e)),
        }
    }

    /// Logical offset as seen by the caller.
    ///
    /// Writing: OS cursor plus unflushed bytes. Reading or idle: OS cursor
    /// minus the unconsumed read-ahead.
    ///
    /// In append modes the OS cursor only moves to end-of-file when dirty
    /// bytes are flushed, so before the first flush `tell` counts from the
    /// cursor the handle was opened at (0), not from the end of the file.
    pub fn tell(&mut self) -> Result<i64, StdioError> {
        let cursor = self
            .file
            .tell()
            .map_err(|errno| StdioError::PositionQueryFailed { errno })? as i64;
        let count = self.buffer.count() as i64;
        Ok(match self.buffer.mode() {
            IoMode::Writing => cursor + count,
            IoMode::Reading | IoMode::Idle => cursor - count + self.buffer.position() as i64,
        })
    }

    /// Reposition the stream.
    ///
    /// Pending writes are flushed first and a flush failure aborts the
    /// seek. Read-ahead is discarded; a `Current` offset is taken relative
    /// to the logical position, not the OS cursor past the read-ahead. On
    /// success the end-of-file indicator is cleared; the error indicator
    /// never is.
    pub fn seek(&mut self, mut offset: i64, whence: Whence) -> Result<(), StdioError> {
        if self.buffer.mode() == IoMode::Writing {
            self.flush()?;
        } else {
            if whence == Whence::Current {
                offset = offset.saturating_sub(self.buffer.readable() as i64);
            }
            self.buffer.reset();
        }
        self.file
            .seek(offset, whence)
            .map_err(|errno| StdioError::SeekFailed { errno })?;
        self.flags.eof = false;
        StdioMetrics::inc(&global_metrics().seeks);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Close
    // -----------------------------------------------------------------------

    /// Flush, then release the buffer and the handle.
    ///
    /// Both are released even when the flush fails. The first failure is
    /// reported.
    pub fn close(mut self) -> Result<(), StdioError> {
        let flushed = self.flush();
        self.closed = true;
        let released = self.file.close();
        StdioMetrics::inc(&global_metrics().closes);
        flushed?;
        released.map_err(|errno| StdioError::CloseFailed { errno })
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn check_error(&self) -> Result<(), StdioError> {
        if self.flags.error {
            Err(self.latched())
        } else {
            Ok(())
        }
    }

    fn latched(&self) -> StdioError {
        StdioError::TransferFailed {
            errno: self.flags.errno,
        }
    }

    fn latch_error(&mut self, errno: i32) -> StdioError {
        if !self.flags.error {
            self.flags.error = true;
            self.flags.errno = errno;
            StdioMetrics::inc(&global_metrics().transfer_failures);
        }
        self.latched()
    }

    /// One transfer-in of up to a full buffer.
    fn fill(&mut self) -> Result<(), StdioError> {
        self.buffer.reset();
        match self.file.read(self.buffer.fill_target()) {
            Ok(0) => {
                self.flags.eof = true;
                Err(StdioError::EndOfStream)
            }
            Ok(n) => {
                self.buffer.commit_fill(n);
                let m = global_metrics();
                StdioMetrics::inc(&m.fills);
                StdioMetrics::add(&m.bytes_in, n);
                Ok(())
            }
            Err(e) => Err(self.latch_error(e)),
        }
    }

    /// Push every dirty byte to the OS, retrying short writes.
    ///
    /// The buffer is reset whatever the outcome.
    fn drain(&mut self) -> Result<(), DrainFailure> {
        let pending = self.buffer.pending_write_data();
        let mut written = 0;
        let mut outcome = Ok(());
        while written < pending.len() {
            match self.file.write(&pending[written..]) {
                Ok(0) => {
                    outcome = Err(DrainFailure::Zero);
                    break;
                }
                Ok(n) => written += n,
                Err(e) => {
                    outcome = Err(DrainFailure::Failed(e));
                    break;
                }
            }
        }
        let m = global_metrics();
        StdioMetrics::add(&m.bytes_out, written);
        if outcome.is_ok() {
            StdioMetrics::inc(&m.flushes);
        }
        self.buffer.reset();
        outcome
    }

    /// Move the OS cursor back over unread read-ahead and drop the buffer.
    fn rewind_read_ahead(&mut self) -> Result<(), StdioError> {
        let unread = self.buffer.readable() as i64;
        self.buffer.reset();
        if unread > 0
            && let Err(e) = self.file.seek(-unread, Whence::Current)
        {
            return Err(self.latch_error(e));
        }
        Ok(())
    }
}

impl<F: RawFile> std::io::Read for Stream<F> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let len = buf.len();
        let n = self.read_items(buf, 1, len);
        if n == 0 && len > 0 && self.flags.error {
            return Err(self.latched().into());
        }
        Ok(n)
    }
}

impl<F: RawFile> std::io::Write for Stream<F> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.write_items(buf, 1, buf.len());
        if n == 0 && !buf.is_empty() {
            let err = if self.flags.error {
                self.latched()
            } else {
                StdioError::EndOfStream
            };
            return Err(err.into());
        }
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Stream::flush(self).map_err(Into::into)
    }
}

impl<F: RawFile> Drop for Stream<F> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.flush();
            let _ = self.file.close();
            StdioMetrics::inc(&global_metrics().closes);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::{FaultPlan, MemFile, MemFs};

    fn open(fs: &MemFs, path: &str, mode: &str, cap: usize) -> Stream<MemFile> {
        Stream::open_in(fs, path, mode, cap).unwrap()
    }

    fn assert_bounds(s: &Stream<MemFile>) {
        assert!(s.buffer_position() <= s.buffered());
        assert!(s.buffered() <= s.capacity());
    }

    #[test]
    fn test_parse_mode_table() {
        let r = parse_mode("r").unwrap();
        assert!(r.readable && !r.writable && !r.create);

        let rp = parse_mode("r+").unwrap();
        assert!(rp.readable && rp.writable && !rp.create && !rp.truncate);

        let w = parse_mode("w").unwrap();
        assert!(w.readable && w.writable && w.create && w.truncate);
        assert_eq!(parse_mode("w+").unwrap(), w);

        let a = parse_mode("a").unwrap();
        assert!(!a.readable && a.writable && a.append && a.create && !a.truncate);

        let ap = parse_mode("a+").unwrap();
        assert!(ap.readable && ap.writable && ap.append && ap.create);
    }

    #[test]
    fn test_parse_mode_binary() {
        assert!(parse_mode("rb").unwrap().binary);
        assert_eq!(parse_mode("r+b"), parse_mode("rb+"));
        assert!(parse_mode("wb+").unwrap().writable);
    }

    #[test]
    fn test_parse_mode_invalid() {
        for bad in ["", "q", "x", "r++", "rbb", "rw", "w+x", "+r", " r"] {
            assert!(parse_mode(bad).is_none(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_flags_to_oflags() {
        let o = flags_to_oflags(&parse_mode("r").unwrap());
        assert_eq!(o & libc::O_ACCMODE, libc::O_RDONLY);

        let o = flags_to_oflags(&parse_mode("w").unwrap());
        assert_eq!(o & libc::O_ACCMODE, libc::O_RDWR);
        assert_ne!(o & libc::O_CREAT, 0);
        assert_ne!(o & libc::O_TRUNC, 0);

        let o = flags_to_oflags(&parse_mode("a").unwrap());
        assert_eq!(o & libc::O_ACCMODE, libc::O_WRONLY);
        assert_ne!(o & libc::O_APPEND, 0);
        assert_eq!(o & libc::O_TRUNC, 0);
    }

    #[test]
    fn test_open_initial_state() {
        let fs = MemFs::new();
        let s = open(&fs, "f", "w", 16);
        assert_eq!(s.mode(), IoMode::Idle);
        assert_eq!(s.buffered(), 0);
        assert!(!s.is_eof());
        assert!(!s.is_error());
        assert_eq!(s.capacity(), 16);
    }

    #[test]
    fn test_invalid_mode_acquires_nothing() {
        let fs = MemFs::new();
        let err = Stream::open_in(&fs, "f", "q", 16).unwrap_err();
        assert_eq!(err, StdioError::InvalidMode("q".into()));
        assert!(!fs.exists("f"));
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_out_of_memory_releases_handle() {
        let fs = MemFs::new();
        let err = Stream::open_in(&fs, "f", "w", usize::MAX).unwrap_err();
        assert_eq!(err, StdioError::OutOfMemory);
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_read_refills_mid_stream() {
        let fs = MemFs::new().with_file("f", b"abcdefg".to_vec());
        let mut s = open(&fs, "f", "r", 3);
        let mut got = Vec::new();
        while let Ok(b) = s.read_byte() {
            got.push(b);
            assert_bounds(&s);
        }
        assert_eq!(got, b"abcdefg");
        assert!(s.is_eof());
        assert!(!s.is_error());
    }

    #[test]
    fn test_eof_latch_until_seek() {
        let fs = MemFs::new().with_file("f", b"z".to_vec());
        let mut s = open(&fs, "f", "r", 4);
        assert_eq!(s.read_byte().unwrap(), b'z');
        assert_eq!(s.read_byte(), Err(StdioError::EndOfStream));
        assert_eq!(s.read_byte(), Err(StdioError::EndOfStream));
        assert!(s.is_eof());
        s.seek(0, Whence::Start).unwrap();
        assert!(!s.is_eof());
        assert_eq!(s.read_byte().unwrap(), b'z');
    }

    #[test]
    fn test_write_buffers_until_full() {
        let fs = MemFs::new();
        let mut s = open(&fs, "f", "w", 4);
        for &b in b"abcd" {
            s.write_byte(b).unwrap();
        }
        assert_eq!(fs.contents("f").unwrap(), b"");
        assert_eq!(s.buffered(), 4);
        s.write_byte(b'e').unwrap();
        assert_eq!(fs.contents("f").unwrap(), b"abcd");
        assert_eq!(s.buffered(), 1);
        s.close().unwrap();
        assert_eq!(fs.contents("f").unwrap(), b"abcde");
    }

    #[test]
    fn test_flush_retries_short_writes() {
        let fs = MemFs::new();
        fs.set_faults(FaultPlan {
            max_write_chunk: Some(3),
            ..Default::default()
        });
        let mut s = open(&fs, "f", "w", 16);
        assert_eq!(s.write_items(b"0123456789", 1, 10), 10);
        s.flush().unwrap();
        assert_eq!(fs.contents("f").unwrap(), b"0123456789");
        assert_eq!(s.mode(), IoMode::Idle);
    }

    #[test]
    fn test_flush_failure_latches_and_discards() {
        let fs = MemFs::new();
        fs.set_faults(FaultPlan {
            fail_write_after: Some(0),
            ..Default::default()
        });
        let mut s = open(&fs, "f", "w", 8);
        s.write_byte(b'x').unwrap();
        let err = s.flush().unwrap_err();
        assert_eq!(err, StdioError::TransferFailed { errno: errno::EIO });
        assert!(s.is_error());
        assert_eq!(s.buffered(), 0);
        assert!(s.flush().is_ok());
        assert!(s.is_error());
        assert!(s.write_byte(b'y').is_err());
    }

    #[test]
    fn test_zero_byte_flush_on_full_buffer_latches_eof() {
        let fs = MemFs::new();
        fs.set_faults(FaultPlan {
            zero_write_after: Some(0),
            ..Default::default()
        });
        let mut s = open(&fs, "f", "w", 2);
        s.write_byte(b'a').unwrap();
        s.write_byte(b'b').unwrap();
        assert_eq!(s.write_byte(b'c'), Err(StdioError::EndOfStream));
        assert!(s.is_eof());
        assert!(!s.is_error());
        assert_eq!(s.buffered(), 0);
    }

    #[test]
    fn test_read_failure_latches_error() {
        let fs = MemFs::new().with_file("f", b"abc".to_vec());
        fs.set_faults(FaultPlan {
            fail_read_after: Some(0),
            ..Default::default()
        });
        let mut s = open(&fs, "f", "r", 8);
        assert!(matches!(
            s.read_byte(),
            Err(StdioError::TransferFailed { .. })
        ));
        fs.set_faults(FaultPlan::default());
        assert!(s.read_byte().is_err());
        s.seek(0, Whence::Start).unwrap();
        assert!(s.is_error());
        assert!(s.read_byte().is_err());
    }

    #[test]
    fn test_tell_while_writing_and_reading() {
        let fs = MemFs::new().with_file("f", b"0123456789".to_vec());
        let mut s = open(&fs, "f", "r+", 4);
        assert_eq!(s.tell().unwrap(), 0);
        s.read_byte().unwrap();
        assert_eq!(s.tell().unwrap(), 1);
        s.read_byte().unwrap();
        s.read_byte().unwrap();
        s.read_byte().unwrap();
        s.read_byte().unwrap();
        assert_eq!(s.tell().unwrap(), 5);

        s.seek(0, Whence::End).unwrap();
        s.write_byte(b'!').unwrap();
        s.write_byte(b'?').unwrap();
        assert_eq!(s.tell().unwrap(), 12);
    }

    #[test]
    fn test_write_after_read_lands_at_logical_offset() {
        let fs = MemFs::new().with_file("f", b"abcdef".to_vec());
        let mut s = open(&fs, "f", "r+", 8);
        assert_eq!(s.read_byte().unwrap(), b'a');
        assert_eq!(s.read_byte().unwrap(), b'b');
        s.write_byte(b'X').unwrap();
        assert_eq!(s.tell().unwrap(), 3);
        s.close().unwrap();
        assert_eq!(fs.contents("f").unwrap(), b"abXdef");
    }

    #[test]
    fn test_read_after_write_flushes_first() {
        let fs = MemFs::new().with_file("f", b"abcdef".to_vec());
        let mut s = open(&fs, "f", "r+", 8);
        s.write_byte(b'1').unwrap();
        s.write_byte(b'2').unwrap();
        assert_eq!(s.read_byte().unwrap(), b'c');
        assert_eq!(fs.contents("f").unwrap(), b"12cdef");
        assert_eq!(s.tell().unwrap(), 3);
    }

    #[test]
    fn test_seek_flushes_pending_writes() {
        let fs = MemFs::new();
        let mut s = open(&fs, "f", "w+", 8);
        s.write_items(b"hello", 1, 5);
        s.seek(0, Whence::Start).unwrap();
        assert_eq!(fs.contents("f").unwrap(), b"hello");
        assert_eq!(s.tell().unwrap(), 0);
        let mut buf = [0u8; 5];
        assert_eq!(s.read_items(&mut buf, 1, 5), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_seek_current_after_read_is_relative_to_logical_offset() {
        let fs = MemFs::new().with_file("f", b"abcdef".to_vec());
        let mut s = open(&fs, "f", "r+", 8);
        assert_eq!(s.read_byte().unwrap(), b'a');
        assert_eq!(s.tell().unwrap(), 1);
        s.seek(0, Whence::Current).unwrap();
        assert_eq!(s.tell().unwrap(), 1);
        assert_eq!(s.read_byte().unwrap(), b'b');

        s.seek(-1, Whence::Current).unwrap();
        s.write_byte(b'B').unwrap();
        s.seek(1, Whence::Current).unwrap();
        assert_eq!(s.read_byte().unwrap(), b'd');
        s.close().unwrap();
        assert_eq!(fs.contents("f").unwrap(), b"aBcdef");
    }

    #[test]
    fn test_tell_in_append_mode_before_first_flush() {
        let fs = MemFs::new().with_file("f", b"abcdef".to_vec());
        let mut s = open(&fs, "f", "a", 8);
        s.write_byte(b'g').unwrap();
        assert_eq!(s.tell().unwrap(), 1);
        s.flush().unwrap();
        assert_eq!(s.tell().unwrap(), 7);
    }

    #[test]
    fn test_seek_aborted_by_flush_failure() {
        let fs = MemFs::new();
        let mut s = open(&fs, "f", "w", 8);
        s.write_byte(b'x').unwrap();
        fs.set_faults(FaultPlan {
            fail_write_after: Some(0),
            ..Default::default()
        });
        assert!(matches!(
            s.seek(0, Whence::Start),
            Err(StdioError::TransferFailed { .. })
        ));
        assert!(s.is_error());
        assert_eq!(s.buffered(), 0);
        assert_eq!(fs.contents("f").unwrap(), b"");
    }

    #[test]
    fn test_seek_failure_keeps_eof_and_discards_buffer() {
        let fs = MemFs::new().with_file("f", b"ab".to_vec());
        let mut s = open(&fs, "f", "r", 8);
        s.read_byte().unwrap();
        fs.set_faults(FaultPlan {
            fail_seek: true,
            ..Default::default()
        });
        let err = s.seek(0, Whence::Start).unwrap_err();
        assert_eq!(err, StdioError::SeekFailed { errno: errno::ESPIPE });
        assert_eq!(s.buffered(), 0);
        assert_eq!(s.mode(), IoMode::Idle);
    }

    #[test]
    fn test_tell_failure() {
        let fs = MemFs::new();
        fs.set_faults(FaultPlan {
            fail_tell: true,
            ..Default::default()
        });
        let mut s = open(&fs, "f", "w", 8);
        assert_eq!(
            s.tell(),
            Err(StdioError::PositionQueryFailed { errno: errno::ESPIPE })
        );
        assert!(!s.is_error());
    }

    #[test]
    fn test_bulk_read_counts_complete_elements() {
        let fs = MemFs::new().with_file("f", b"abcdefg".to_vec());
        let mut s = open(&fs, "f", "r", 4);
        let mut buf = [0u8; 12];
        assert_eq!(s.read_items(&mut buf, 3, 4), 2);
        assert_eq!(&buf[..7], b"abcdefg");
        assert!(s.is_eof());
    }

    #[test]
    fn test_bulk_ops_with_zero_size() {
        let fs = MemFs::new().with_file("f", b"abc".to_vec());
        let mut s = open(&fs, "f", "r+", 4);
        let mut buf = [0u8; 4];
        assert_eq!(s.read_items(&mut buf, 0, 4), 0);
        assert_eq!(s.write_items(b"abc", 0, 3), 0);
        assert_eq!(s.mode(), IoMode::Idle);
    }

    #[test]
    fn test_bulk_write_stops_at_failure() {
        let fs = MemFs::new();
        fs.set_faults(FaultPlan {
            fail_write_after: Some(0),
            ..Default::default()
        });
        let mut s = open(&fs, "f", "w", 4);
        assert_eq!(s.write_items(b"abcdefghij", 2, 5), 2);
        assert!(s.is_error());
    }

    #[test]
    fn test_write_to_read_only_stream_latches_error() {
        let fs = MemFs::new().with_file("f", b"abc".to_vec());
        let mut s = open(&fs, "f", "r", 4);
        assert_eq!(
            s.write_byte(b'x'),
            Err(StdioError::TransferFailed { errno: errno::EBADF })
        );
        assert!(s.is_error());
    }

    #[test]
    fn test_close_reports_flush_failure_and_releases() {
        let fs = MemFs::new();
        let mut s = open(&fs, "f", "w", 8);
        s.write_byte(b'x').unwrap();
        fs.set_faults(FaultPlan {
            fail_write_after: Some(0),
            ..Default::default()
        });
        assert!(matches!(
            s.close(),
            Err(StdioError::TransferFailed { .. })
        ));
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_close_reports_release_failure() {
        let fs = MemFs::new();
        let s = open(&fs, "f", "w", 8);
        fs.set_faults(FaultPlan {
            fail_close: true,
            ..Default::default()
        });
        assert_eq!(s.close(), Err(StdioError::CloseFailed { errno: errno::EIO }));
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_drop_flushes_and_releases() {
        let fs = MemFs::new();
        {
            let mut s = open(&fs, "f", "w", 8);
            s.write_items(b"kept", 1, 4);
        }
        assert_eq!(fs.contents("f").unwrap(), b"kept");
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_io_traits() {
        use std::io::{Read, Write};

        let fs = MemFs::new();
        let mut s = open(&fs, "f", "w+", 4);
        s.write_all(b"through io::Write").unwrap();
        Write::flush(&mut s).unwrap();
        s.seek(0, Whence::Start).unwrap();
        let mut out = String::new();
        s.read_to_string(&mut out).unwrap();
        assert_eq!(out, "through io::Write");
    }
}
