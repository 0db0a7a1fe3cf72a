//! Buffer sizing configuration.
//!
//! The default stream buffer capacity is read once from the
//! `SOSTDIO_BUFSIZE` environment variable:
//! - unset, empty, zero or unparsable: [`DEFAULT_BUFSIZE`] (4096 bytes)
//! - otherwise the value, clamped to `1..=MAX_BUFSIZE`
//!
//! Streams opened through [`crate::Stream::open_in`] take an explicit
//! capacity and bypass this setting.

use std::sync::OnceLock;

/// Environment variable holding the default buffer capacity.
pub const BUFSIZE_ENV: &str = "SOSTDIO_BUFSIZE";

/// Buffer capacity used when nothing else is configured.
pub const DEFAULT_BUFSIZE: usize = 4096;

/// Upper bound accepted from the environment (1 MiB).
pub const MAX_BUFSIZE: usize = 1 << 20;

/// Parse a capacity value leniently.
#[must_use]
pub fn parse_bufsize(raw: &str) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => DEFAULT_BUFSIZE,
        Ok(n) => n.min(MAX_BUFSIZE),
    }
}

static BUFFER_CAPACITY: OnceLock<usize> = OnceLock::new();

/// Get the configured default capacity (reads env var on first call, caches thereafter).
#[must_use]
pub fn buffer_capacity() -> usize {
    *BUFFER_CAPACITY.get_or_init(|| {
        std::env::var(BUFSIZE_ENV)
            .map(|v| parse_bufsize(&v))
            .unwrap_or(DEFAULT_BUFSIZE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plain_sizes() {
        assert_eq!(parse_bufsize("4096"), 4096);
        assert_eq!(parse_bufsize(" 17 "), 17);
        assert_eq!(parse_bufsize("1"), 1);
    }

    #[test]
    fn parse_falls_back_to_default() {
        assert_eq!(parse_bufsize(""), DEFAULT_BUFSIZE);
        assert_eq!(parse_bufsize("0"), DEFAULT_BUFSIZE);
        assert_eq!(parse_bufsize("-5"), DEFAULT_BUFSIZE);
        assert_eq!(parse_bufsize("lots"), DEFAULT_BUFSIZE);
    }

    #[test]
    fn parse_clamps_to_max() {
        assert_eq!(parse_bufsize("999999999"), MAX_BUFSIZE);
    }

    #[test]
    fn configured_capacity_is_in_range() {
        let cap = buffer_capacity();
        assert!((1..=MAX_BUFSIZE).contains(&cap));
    }
}
