//! Scenario verification harness for sostdio.
//!
//! This crate provides:
//! - Fixtures: JSON scenarios that drive one stream through a list of
//!   steps against a seeded in-memory file system
//! - Runner: executes scenarios and compares rendered outcomes
//! - Round trips: byte-exact write/read checks on the real file system
//! - Structured logging: JSONL run logs and their validation
//! - Report generation: markdown + JSON verification reports

#![forbid(unsafe_code)]

pub mod diff;
pub mod error;
pub mod fixtures;
pub mod report;
pub mod roundtrip;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use error::HarnessError;
pub use fixtures::{FixtureSet, Op, Scenario, Step};
pub use report::VerificationReport;
pub use runner::ScenarioRunner;
pub use verify::{VerificationResult, VerificationSummary};
