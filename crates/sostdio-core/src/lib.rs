//! # sostdio-core
//!
//! Safe Rust implementation of a minimal buffered stdio layer.
//!
//! A [`stdio::Stream`] bundles one raw file handle with one fixed-size
//! buffer and tracks read/write mode, logical position, and the latched
//! end-of-file and error indicators. The raw handle is reached through the
//! [`os::RawFile`] seam, so the engine runs over a real file descriptor or
//! over the in-memory backend used by tests and the harness.
//!
//! No `unsafe` code is permitted at the crate level; the file-descriptor
//! backend is the single exception.

#![deny(unsafe_code)]

pub mod config;
pub mod errno;
pub mod metrics;
pub mod os;
pub mod stdio;

pub use stdio::{IoMode, OpenFlags, StdioError, Stream, Whence, parse_mode};
