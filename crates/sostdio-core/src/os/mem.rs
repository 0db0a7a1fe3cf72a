//! In-memory backend with fault injection.
//!
//! `MemFs` is a flat map from path to byte vector. Handles opened from it
//! honor the same access and creation rules as the descriptor backend,
//! and a shared [`FaultPlan`] can make any primitive fail on demand so the
//! stream engine's error branches are reachable without a broken disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{FileSystem, RawFile, Whence};
use crate::errno;
use crate::stdio::OpenFlags;

/// Which primitives should fail, and when.
///
/// Call thresholds count calls across every handle of the file system.
/// Once a threshold is reached the primitive keeps failing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Reads succeed this many times, then fail with `errno`.
    pub fail_read_after: Option<usize>,
    /// Writes succeed this many times, then fail with `errno`.
    pub fail_write_after: Option<usize>,
    /// Writes succeed this many times, then report zero bytes written.
    pub zero_write_after: Option<usize>,
    /// Cap on bytes accepted by a single write call.
    pub max_write_chunk: Option<usize>,
    /// Every seek fails.
    pub fail_seek: bool,
    /// Every cursor query fails.
    pub fail_tell: bool,
    /// Every close fails (the handle is still released).
    pub fail_close: bool,
    /// Errno reported by injected failures; `EIO` when unset.
    pub errno: Option<i32>,
}

impl FaultPlan {
    fn errno(&self) -> i32 {
        self.errno.unwrap_or(errno::EIO)
    }
}

#[derive(Debug, Default)]
struct MemState {
    files: HashMap<PathBuf, Arc<Mutex<Vec<u8>>>>,
    faults: FaultPlan,
    read_calls: usize,
    write_calls: usize,
    open_handles: usize,
    next_id: u32,
}

/// A shared in-memory file system. Clones refer to the same files.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    state: Arc<Mutex<MemState>>,
}

impl MemFs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let mut st = self.state.lock();
        st.files
            .insert(path.into(), Arc::new(Mutex::new(contents.into())));
    }

    /// Builder form of [`MemFs::insert`].
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Current contents of a file, if it exists.
    #[must_use]
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let st = self.state.lock();
        st.files.get(path.as_ref()).map(|f| f.lock().clone())
    }

    #[must_use]
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().files.contains_key(path.as_ref())
    }

    /// Replace the fault plan and reset the call counters.
    pub fn set_faults(&self, faults: FaultPlan) {
        let mut st = self.state.lock();
        st.faults = faults;
        st.read_calls = 0;
        st.write_calls = 0;
    }

    /// Number of handles acquired and not yet closed.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.state.lock().open_handles
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn open(&self, path: &Path, flags: &OpenFlags) -> Result<MemFile, i32> {
        let mut st = self.state.lock();
        let data = match st.files.get(path) {
            Some(existing) => Arc::clone(existing),
            None if flags.create => {
                let fresh = Arc::new(Mutex::new(Vec::new()));
                st.files.insert(path.to_path_buf(), Arc::clone(&fresh));
                fresh
            }
            None => return Err(errno::ENOENT),
        };
        if flags.truncate {
            data.lock().clear();
        }
        st.open_handles += 1;
        st.next_id += 1;
        Ok(MemFile {
            id: st.next_id,
            data,
            fs: Arc::clone(&self.state),
            cursor: 0,
            flags: *flags,
            open: true,
        })
    }
}

/// A handle onto one [`MemFs`] file.
#[derive(Debug)]
pub struct MemFile {
    id: u32,
    data: Arc<Mutex<Vec<u8>>>,
    fs: Arc<Mutex<MemState>>,
    cursor: u64,
    flags: OpenFlags,
    open: bool,
}

impl RawFile for MemFile {
    type Native = u32;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32> {
        if !self.open || !self.flags.readable {
            return Err(errno::EBADF);
        }
        {
            let mut st = self.fs.lock();
            let call = st.read_calls;
            st.read_calls += 1;
            if st.faults.fail_read_after.is_some_and(|n| call >= n) {
                return Err(st.faults.errno());
            }
        }
        let data = self.data.lock();
        let start = usize::try_from(self.cursor).unwrap_or(usize::MAX);
        if start >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.cursor += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, i32> {
        if !self.open || !self.flags.writable {
            return Err(errno::EBADF);
        }
        let n = {
            let mut st = self.fs.lock();
            let call = st.write_calls;
            st.write_calls += 1;
            if st.faults.fail_write_after.is_some_and(|n| call >= n) {
                return Err(st.faults.errno());
            }
            if st.faults.zero_write_after.is_some_and(|n| call >= n) {
                return Ok(0);
            }
            st.faults
                .max_write_chunk
                .map_or(buf.len(), |cap| buf.len().min(cap))
        };
        let mut data = self.data.lock();
        if self.flags.append {
            self.cursor = data.len() as u64;
        }
        let start = usize::try_from(self.cursor).map_err(|_| errno::ENOSPC)?;
        let end = start + n;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(&buf[..n]);
        self.cursor = end as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, i32> {
        if !self.open {
            return Err(errno::EBADF);
        }
        if self.fs.lock().faults.fail_seek {
            return Err(errno::ESPIPE);
        }
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.cursor as i64,
            Whence::End => self.data.lock().len() as i64,
        };
        let target = base.checked_add(offset).ok_or(errno::EINVAL)?;
        if target < 0 {
            return Err(errno::EINVAL);
        }
        self.cursor = target as u64;
        Ok(self.cursor)
    }

    fn tell(&mut self) -> Result<u64, i32> {
        if !self.open {
            return Err(errno::EBADF);
        }
        if self.fs.lock().faults.fail_tell {
            return Err(errno::ESPIPE);
        }
        Ok(self.cursor)
    }

    fn close(&mut self) -> Result<(), i32> {
        if !self.open {
            return Err(errno::EBADF);
        }
        self.open = false;
        let mut st = self.fs.lock();
        st.open_handles -= 1;
        if st.faults.fail_close {
            Err(st.faults.errno())
        } else {
            Ok(())
        }
    }

    fn native_handle(&self) -> u32 {
        self.id
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            self.fs.lock().open_handles -= 1;
        }
    }
}
