//! Atomic counters for stream observability.
//!
//! All counters use relaxed ordering. They are advisory/diagnostic,
//! not synchronization primitives.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide stream operation counters.
pub struct StdioMetrics {
    /// Streams successfully opened.
    pub opens: AtomicU64,
    /// Streams closed (successfully or not).
    pub closes: AtomicU64,
    /// Transfer-in calls that delivered at least one byte.
    pub fills: AtomicU64,
    /// Transfer-out passes that emptied a dirty buffer.
    pub flushes: AtomicU64,
    /// Bytes received from the OS.
    pub bytes_in: AtomicU64,
    /// Bytes handed to the OS.
    pub bytes_out: AtomicU64,
    /// Transfer failures that latched a stream's error flag.
    pub transfer_failures: AtomicU64,
    /// Successful repositionings.
    pub seeks: AtomicU64,
}

impl StdioMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            opens: AtomicU64::new(0),
            closes: AtomicU64::new(0),
            fills: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            transfer_failures: AtomicU64::new(0),
            seeks: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            opens: Self::get(&self.opens),
            closes: Self::get(&self.closes),
            fills: Self::get(&self.fills),
            flushes: Self::get(&self.flushes),
            bytes_in: Self::get(&self.bytes_in),
            bytes_out: Self::get(&self.bytes_out),
            transfer_failures: Self::get(&self.transfer_failures),
            seeks: Self::get(&self.seeks),
        }
    }
}

impl Default for StdioMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all stream counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub opens: u64,
    pub closes: u64,
    pub fills: u64,
    pub flushes: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub transfer_failures: u64,
    pub seeks: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "opens={} closes={} fills={} flushes={} bytes_in={} bytes_out={} transfer_failures={} seeks={}",
            self.opens,
            self.closes,
            self.fills,
            self.flushes,
            self.bytes_in,
            self.bytes_out,
            self.transfer_failures,
            self.seeks
        )
    }
}

static GLOBAL_METRICS: StdioMetrics = StdioMetrics::new();

/// Access the global metrics singleton.
#[must_use]
pub fn global_metrics() -> &'static StdioMetrics {
    &GLOBAL_METRICS
}
