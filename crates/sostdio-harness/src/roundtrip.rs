//! Round trips through real files.
//!
//! Writes a deterministic pattern byte by byte at sizes straddling the
//! buffer capacity, closes, reads it back in one bulk call and compares
//! both the bytes on disk and the bytes delivered.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sostdio_core::Stream;
use sostdio_core::os::OsFs;

use crate::error::HarnessError;
use crate::runner::sha256_hex;

/// Outcome of one round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundTripCase {
    pub size: usize,
    pub sha256: String,
    /// Whether end of file was latched after reading everything back.
    pub eof_latched: bool,
}

/// Summary of a round-trip run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundTripSummary {
    pub capacity: usize,
    pub cases: Vec<RoundTripCase>,
}

/// Sizes that straddle every buffer boundary of interest.
#[must_use]
pub fn boundary_sizes(capacity: usize) -> Vec<usize> {
    let c = capacity.max(1);
    let mut sizes = vec![0, 1, c - 1, c, c + 1, 3 * c + 7];
    sizes.sort_unstable();
    sizes.dedup();
    sizes
}

fn pattern(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i.wrapping_mul(131) ^ (i >> 8)) as u8).collect()
}

/// Run a round trip for every boundary size in `dir`. Scratch files are
/// removed on success.
pub fn run_roundtrip(dir: &Path, capacity: usize) -> Result<RoundTripSummary, HarnessError> {
    std::fs::create_dir_all(dir)?;
    let mut cases = Vec::new();
    for size in boundary_sizes(capacity) {
        let path = dir.join(format!("sostdio-roundtrip-{}-{size}.bin", std::process::id()));
        cases.push(round_trip_one(&path, size, capacity)?);
        std::fs::remove_file(&path)?;
    }
    Ok(RoundTripSummary { capacity, cases })
}

fn round_trip_one(path: &Path, size: usize, capacity: usize) -> Result<RoundTripCase, HarnessError> {
    let fail = |reason: String| HarnessError::RoundTrip { size, reason };
    let data = pattern(size);

    let mut w = Stream::open_in(&OsFs, path, "w", capacity).map_err(|e| fail(e.to_string()))?;
    for &b in &data {
        w.write_byte(b).map_err(|e| fail(format!("write: {e}")))?;
    }
    w.close().map_err(|e| fail(format!("close after write: {e}")))?;

    let on_disk = std::fs::read(path)?;
    if on_disk != data {
        return Err(fail(format!(
            "disk holds {} bytes, wrote {size}",
            on_disk.len()
        )));
    }

    let mut r = Stream::open_in(&OsFs, path, "r", capacity).map_err(|e| fail(e.to_string()))?;
    let mut back = vec![0u8; size + 1];
    let n = r.read_items(&mut back, 1, size + 1);
    let eof_latched = r.is_eof();
    if r.is_error() {
        return Err(fail(format!("read latched errno {}", r.last_errno())));
    }
    r.close().map_err(|e| fail(format!("close after read: {e}")))?;
    if n != size || back[..n] != data[..] {
        return Err(fail(format!("read back {n} bytes that differ from the pattern")));
    }

    Ok(RoundTripCase {
        size,
        sha256: sha256_hex(&data),
        eof_latched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_for_small_capacity_are_deduplicated() {
        assert_eq!(boundary_sizes(1), vec![0, 1, 2, 10]);
        assert_eq!(boundary_sizes(4096), vec![0, 1, 4095, 4096, 4097, 12295]);
    }

    #[test]
    fn pattern_is_not_periodic_in_capacity() {
        let p = pattern(600);
        assert_ne!(p[..256], p[256..512]);
    }
}
