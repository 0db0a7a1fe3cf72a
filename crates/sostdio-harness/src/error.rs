//! Harness failures.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no fixture JSON files found in {}", .0.display())]
    NoFixtures(PathBuf),
    #[error("round trip of {size} bytes failed: {reason}")]
    RoundTrip { size: usize, reason: String },
}
