//! Buffered stream I/O.
//!
//! Implements an `fopen`-style stream: open-by-mode, single-byte and bulk
//! read/write, explicit flush, seek/tell, and latched end-of-file and
//! error indicators over one fixed-size buffer per stream.

pub mod buffer;
pub mod error;
pub mod file;

pub use crate::os::Whence;
pub use buffer::{IoMode, StreamBuffer};
pub use error::StdioError;
pub use file::{OpenFlags, Stream, flags_to_oflags, parse_mode};
