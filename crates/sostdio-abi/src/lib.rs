// All extern "C" exports accept raw pointers from C callers; validity is
// checked at the boundary, so per-function safety docs would be boilerplate.
#![allow(clippy::missing_safety_doc)]
//! # sostdio-abi
//!
//! `extern "C"` boundary for sostdio.
//!
//! This crate produces a `cdylib` (`libso_stdio.so`) exposing the `so_*`
//! stream functions. Each entry point validates its raw arguments, looks
//! the stream up in the registry, and delegates to the safe engine in
//! `sostdio-core`.
//!
//! ```text
//! C caller -> ABI entry (this crate) -> registry lookup -> core Stream -> return
//! ```

mod errno_abi;
pub mod stdio_abi;

pub use stdio_abi::SO_EOF;
