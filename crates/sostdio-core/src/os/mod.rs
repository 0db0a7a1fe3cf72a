//! Raw file handle seam.
//!
//! The stream engine consumes four primitives from the operating system:
//! open, close, transfer (read/write) and set-position. They are modelled
//! as the [`FileSystem`] and [`RawFile`] traits. Every primitive reports
//! failure as a POSIX errno value, the way the raw syscall wrappers do.
//!
//! Two backends ship with the crate:
//! - [`OsFs`] / [`FdFile`]: libc calls on a real file descriptor.
//! - [`MemFs`] / [`MemFile`]: in-memory files with fault injection.

#[allow(unsafe_code)]
mod fd;
mod mem;

use std::fmt;
use std::path::Path;

use crate::stdio::OpenFlags;

pub use fd::{FdFile, OsFs};
pub use mem::{FaultPlan, MemFile, MemFs};

/// Reference point for a repositioning, matching `SEEK_SET`/`SEEK_CUR`/`SEEK_END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

/// POSIX constant values for the seek `whence` argument.
pub const SEEK_SET: i32 = 0;
pub const SEEK_CUR: i32 = 1;
pub const SEEK_END: i32 = 2;

impl Whence {
    /// Convert from POSIX integer constant.
    pub fn from_posix(whence: i32) -> Option<Whence> {
        match whence {
            SEEK_SET => Some(Whence::Start),
            SEEK_CUR => Some(Whence::Current),
            SEEK_END => Some(Whence::End),
            _ => None,
        }
    }

    /// Convert to POSIX integer constant.
    pub fn to_posix(self) -> i32 {
        match self {
            Whence::Start => SEEK_SET,
            Whence::Current => SEEK_CUR,
            Whence::End => SEEK_END,
        }
    }
}

/// An open OS-level file handle.
///
/// `read` and `write` may move fewer bytes than requested; the caller
/// decides whether to retry. `Ok(0)` from `read` means end of file.
pub trait RawFile {
    /// Handle type surfaced to collaborators that need the raw handle.
    type Native: Copy + fmt::Debug;

    /// Transfer bytes in at the current cursor.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32>;

    /// Transfer bytes out at the current cursor.
    fn write(&mut self, buf: &[u8]) -> Result<usize, i32>;

    /// Move the cursor and return its new absolute position.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, i32>;

    /// Query the cursor without moving it.
    fn tell(&mut self) -> Result<u64, i32> {
        self.seek(0, Whence::Current)
    }

    /// Release the handle. Called at most once per handle.
    fn close(&mut self) -> Result<(), i32>;

    /// The underlying OS handle.
    fn native_handle(&self) -> Self::Native;
}

/// Something that can acquire [`RawFile`] handles by path.
pub trait FileSystem {
    type File: RawFile;

    /// Acquire a handle with the access and creation semantics in `flags`.
    fn open(&self, path: &Path, flags: &OpenFlags) -> Result<Self::File, i32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whence_from_posix() {
        assert_eq!(Whence::from_posix(0), Some(Whence::Start));
        assert_eq!(Whence::from_posix(1), Some(Whence::Current));
        assert_eq!(Whence::from_posix(2), Some(Whence::End));
        assert_eq!(Whence::from_posix(3), None);
        assert_eq!(Whence::from_posix(-1), None);
    }

    #[test]
    fn whence_round_trips_through_posix() {
        for w in [Whence::Start, Whence::Current, Whence::End] {
            assert_eq!(Whence::from_posix(w.to_posix()), Some(w));
        }
    }
}
