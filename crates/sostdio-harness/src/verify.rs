//! Output comparison and verification.

use serde::{Deserialize, Serialize};

/// Result of verifying a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Fixture family and scenario name.
    pub case_name: String,
    /// Behavioral property the scenario exercises.
    pub property: String,
    /// Whether every step rendered its expected outcome.
    pub passed: bool,
    /// Expected transcript, one step per line.
    pub expected: String,
    /// Transcript produced by the stream engine.
    pub actual: String,
    /// Diff of the first mismatching step, if the case failed.
    pub diff: Option<String>,
    /// SHA-256 of the scenario file after the last step, if it exists.
    pub file_sha256: Option<String>,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        Self {
            total,
            passed,
            failed,
            results,
        }
    }

    /// Returns true if all cases passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
