//! Thread-local `errno` access for the C caller.

use std::ffi::c_int;

/// Store `val` in the calling thread's `errno`.
#[inline]
pub(crate) fn set_errno(val: c_int) {
    // SAFETY: __errno_location always returns a valid pointer to the
    // calling thread's errno slot.
    unsafe { *libc::__errno_location() = val };
}
