//! ABI layer for the `so_*` stream functions.
//!
//! Provides stream management (`so_fopen`/`so_fclose`), byte and bulk I/O
//! (`so_fgetc`/`so_fputc`/`so_fread`/`so_fwrite`), `so_fflush`, seeking
//! (`so_fseek`/`so_ftell`), status (`so_feof`/`so_ferror`) and the raw
//! descriptor escape hatch (`so_fileno`).
//!
//! Architecture: a global registry maps opaque `SO_FILE*` addresses to
//! `Stream` instances from sostdio-core. Addresses are never dereferenced,
//! so a stale or foreign pointer is rejected with `EBADF` instead of
//! touching freed memory, and a second `so_fclose` on the same pointer
//! fails cleanly.

use std::collections::HashMap;
use std::ffi::{CStr, OsStr, c_char, c_int, c_long, c_void};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use sostdio_core::errno;
use sostdio_core::{Stream, StdioError, Whence};

use crate::errno_abi::set_errno;

/// Return value signalling failure or end of file.
pub const SO_EOF: c_int = -1;

// ---------------------------------------------------------------------------
// Stream registry
// ---------------------------------------------------------------------------

/// First id handed out; keeps ids clear of small integers and null.
const FIRST_STREAM_ID: usize = 0x1000_0010;

static NEXT_STREAM_ID: AtomicUsize = AtomicUsize::new(FIRST_STREAM_ID);

fn registry() -> &'static Mutex<HashMap<usize, Stream>> {
    static REG: OnceLock<Mutex<HashMap<usize, Stream>>> = OnceLock::new();
    REG.get_or_init(|| Mutex::new(HashMap::new()))
}

fn alloc_stream_id() -> usize {
    NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed)
}

/// Run `f` on the registered stream, or fail with `EBADF`.
fn with_stream<R>(stream: *mut c_void, on_missing: R, f: impl FnOnce(&mut Stream) -> R) -> R {
    let mut reg = registry().lock();
    match reg.get_mut(&(stream as usize)) {
        Some(s) => f(s),
        None => {
            set_errno(errno::EBADF);
            on_missing
        }
    }
}

fn report(err: &StdioError) {
    let e = err.errno();
    if e != 0 {
        set_errno(e);
    }
}

// ---------------------------------------------------------------------------
// so_fopen / so_fclose
// ---------------------------------------------------------------------------

/// Open `pathname` with an `fopen`-style `mode`. Returns null on failure.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fopen(pathname: *const c_char, mode: *const c_char) -> *mut c_void {
    if pathname.is_null() || mode.is_null() {
        set_errno(errno::EINVAL);
        return std::ptr::null_mut();
    }

    let path_bytes = unsafe { CStr::from_ptr(pathname) }.to_bytes();
    let Ok(mode_str) = unsafe { CStr::from_ptr(mode) }.to_str() else {
        set_errno(errno::EINVAL);
        return std::ptr::null_mut();
    };

    match Stream::open(Path::new(OsStr::from_bytes(path_bytes)), mode_str) {
        Ok(stream) => {
            let id = alloc_stream_id();
            registry().lock().insert(id, stream);
            id as *mut c_void
        }
        Err(err) => {
            report(&err);
            std::ptr::null_mut()
        }
    }
}

/// Flush and close a stream. The stream is gone afterwards either way.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fclose(stream: *mut c_void) -> c_int {
    let Some(s) = registry().lock().remove(&(stream as usize)) else {
        set_errno(errno::EBADF);
        return SO_EOF;
    };
    match s.close() {
        Ok(()) => 0,
        Err(err) => {
            report(&err);
            SO_EOF
        }
    }
}

/// The underlying file descriptor, or -1 for an unknown stream.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fileno(stream: *mut c_void) -> c_int {
    with_stream(stream, -1, |s| s.native_handle())
}

// ---------------------------------------------------------------------------
// so_fflush / so_fseek / so_ftell
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fflush(stream: *mut c_void) -> c_int {
    with_stream(stream, SO_EOF, |s| match s.flush() {
        Ok(()) => 0,
        Err(err) => {
            report(&err);
            SO_EOF
        }
    })
}

/// Reposition a stream. `whence` is `SEEK_SET`, `SEEK_CUR` or `SEEK_END`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fseek(stream: *mut c_void, offset: c_long, whence: c_int) -> c_int {
    let Some(whence) = Whence::from_posix(whence) else {
        set_errno(errno::EINVAL);
        return -1;
    };
    with_stream(stream, -1, |s| match s.seek(offset as i64, whence) {
        Ok(()) => 0,
        Err(err) => {
            report(&err);
            -1
        }
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_ftell(stream: *mut c_void) -> c_long {
    with_stream(stream, -1, |s| match s.tell() {
        Ok(off) => off as c_long,
        Err(err) => {
            report(&err);
            -1
        }
    })
}

// ---------------------------------------------------------------------------
// so_fread / so_fwrite
// ---------------------------------------------------------------------------

/// Read up to `nmemb` elements of `size` bytes. Returns complete elements read.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fread(
    ptr: *mut c_void,
    size: usize,
    nmemb: usize,
    stream: *mut c_void,
) -> usize {
    let Some(total) = size.checked_mul(nmemb) else {
        set_errno(errno::EINVAL);
        return 0;
    };
    if ptr.is_null() || total == 0 {
        return 0;
    }
    let dst = unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), total) };
    with_stream(stream, 0, |s| s.read_items(dst, size, nmemb))
}

/// Write up to `nmemb` elements of `size` bytes. Returns complete elements written.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fwrite(
    ptr: *const c_void,
    size: usize,
    nmemb: usize,
    stream: *mut c_void,
) -> usize {
    let Some(total) = size.checked_mul(nmemb) else {
        set_errno(errno::EINVAL);
        return 0;
    };
    if ptr.is_null() || total == 0 {
        return 0;
    }
    let src = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), total) };
    with_stream(stream, 0, |s| s.write_items(src, size, nmemb))
}

// ---------------------------------------------------------------------------
// so_fgetc / so_fputc
// ---------------------------------------------------------------------------

/// Next byte as an unsigned char widened to int, or `SO_EOF`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fgetc(stream: *mut c_void) -> c_int {
    with_stream(stream, SO_EOF, |s| match s.read_byte() {
        Ok(b) => c_int::from(b),
        Err(err) => {
            report(&err);
            SO_EOF
        }
    })
}

/// Write `c` converted to unsigned char. Returns that byte, or `SO_EOF`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_fputc(c: c_int, stream: *mut c_void) -> c_int {
    with_stream(stream, SO_EOF, |s| match s.write_byte(c as u8) {
        Ok(b) => c_int::from(b),
        Err(err) => {
            report(&err);
            SO_EOF
        }
    })
}

// ---------------------------------------------------------------------------
// so_feof / so_ferror
// ---------------------------------------------------------------------------

/// Nonzero (`SO_EOF`) once end of file has been reached.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_feof(stream: *mut c_void) -> c_int {
    with_stream(stream, 0, |s| if s.is_eof() { SO_EOF } else { 0 })
}

/// Nonzero (`SO_EOF`) once a transfer has failed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn so_ferror(stream: *mut c_void) -> c_int {
    with_stream(stream, 0, |s| if s.is_error() { SO_EOF } else { 0 })
}
