//! File-descriptor backend.
//!
//! Thin wrappers over libc `open`/`read`/`write`/`lseek`/`close`.
//! Interrupted calls (`EINTR`) are retried here so the engine never sees
//! them; every other failure is returned as the raw errno.

use std::ffi::CString;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use super::{FileSystem, RawFile, Whence};
use crate::errno;
use crate::stdio::{OpenFlags, flags_to_oflags};

/// Permission bits for newly created files (before umask).
const CREATE_MODE: libc::c_uint = 0o666;

#[inline]
fn last_errno() -> i32 {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(errno::EIO)
}

/// The host file system, reached through libc.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    type File = FdFile;

    fn open(&self, path: &Path, flags: &OpenFlags) -> Result<FdFile, i32> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| errno::EINVAL)?;
        let oflags = flags_to_oflags(flags) | libc::O_CLOEXEC;
        loop {
            // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
            let fd = unsafe { libc::open(c_path.as_ptr(), oflags, CREATE_MODE) };
            if fd >= 0 {
                return Ok(FdFile { fd });
            }
            let e = last_errno();
            if e != errno::EINTR {
                return Err(e);
            }
        }
    }
}

/// An owned file descriptor.
///
/// The descriptor is closed by [`RawFile::close`]; dropping an unclosed
/// `FdFile` closes it and discards any error.
#[derive(Debug)]
pub struct FdFile {
    fd: RawFd,
}

impl AsRawFd for FdFile {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl RawFile for FdFile {
    type Native = RawFd;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, i32> {
        loop {
            // SAFETY: buf is a live, writable region of buf.len() bytes.
            let rc = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
            if rc >= 0 {
                return Ok(rc as usize);
            }
            let e = last_errno();
            if e != errno::EINTR {
                return Err(e);
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, i32> {
        loop {
            // SAFETY: buf is a live, readable region of buf.len() bytes.
            let rc = unsafe { libc::write(self.fd, buf.as_ptr().cast(), buf.len()) };
            if rc >= 0 {
                return Ok(rc as usize);
            }
            let e = last_errno();
            if e != errno::EINTR {
                return Err(e);
            }
        }
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, i32> {
        // SAFETY: lseek has no memory-safety preconditions.
        let rc = unsafe { libc::lseek(self.fd, offset as libc::off_t, whence.to_posix()) };
        if rc < 0 {
            Err(last_errno())
        } else {
            Ok(rc as u64)
        }
    }

    fn close(&mut self) -> Result<(), i32> {
        if self.fd < 0 {
            return Err(errno::EBADF);
        }
        let fd = std::mem::replace(&mut self.fd, -1);
        // SAFETY: fd was owned by this handle and is not used after this call.
        // close(2) must not be retried on EINTR on Linux.
        let rc = unsafe { libc::close(fd) };
        if rc < 0 { Err(last_errno()) } else { Ok(()) }
    }

    fn native_handle(&self) -> RawFd {
        self.fd
    }
}

impl Drop for FdFile {
    fn drop(&mut self) {
        if self.fd >= 0 {
            let _ = RawFile::close(self);
        }
    }
}
