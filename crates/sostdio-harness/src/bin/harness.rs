//! CLI entrypoint for the sostdio verification harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sostdio_harness::structured_log::{LogEmitter, validate_log_file};
use sostdio_harness::{
    FixtureSet, ScenarioRunner, VerificationReport, VerificationSummary, roundtrip,
    structured_log,
};

/// Verification tooling for sostdio.
#[derive(Debug, Parser)]
#[command(name = "sostdio-harness")]
#[command(about = "Scenario verification harness for sostdio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run fixture scenarios against the stream engine.
    Verify {
        /// Fixture JSON file, or a directory of them.
        #[arg(long)]
        fixture: PathBuf,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Output report path (markdown); a JSON twin is written beside it.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Optional fixed timestamp string for deterministic report generation.
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Write and re-read files straddling the buffer capacity on the real file system.
    Roundtrip {
        /// Scratch directory for the round-trip files.
        #[arg(long)]
        dir: PathBuf,
        /// Buffer capacity in bytes (defaults to SOSTDIO_BUFSIZE or 4096).
        #[arg(long)]
        capacity: Option<usize>,
    },
    /// Validate a structured JSONL log file.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify {
            fixture,
            log,
            report,
            timestamp,
        } => {
            eprintln!("Verifying scenarios in {}", fixture.display());
            let sets = FixtureSet::load_all(&fixture)?;
            let runner = ScenarioRunner::new("fixture-verify");
            let run_id = format!("run-{}", std::process::id());

            let mut results = Vec::new();
            match log {
                Some(log_path) => {
                    let mut emitter = LogEmitter::to_file(&log_path, "sostdio-harness", &run_id)?;
                    for set in &sets {
                        results.extend(runner.run_logged(set, &mut emitter)?);
                    }
                    emitter.flush()?;
                    eprintln!("Wrote structured log to {}", log_path.display());
                }
                None => {
                    for set in &sets {
                        results.extend(runner.run(set));
                    }
                }
            }

            let report_doc = VerificationReport {
                title: String::from("sostdio Verification Report"),
                timestamp: timestamp.unwrap_or_else(structured_log::now_utc),
                summary: VerificationSummary::from_results(results),
            };

            for r in report_doc.summary.results.iter().filter(|r| !r.passed) {
                eprintln!("FAIL {}", r.case_name);
                if let Some(diff) = &r.diff {
                    eprint!("{diff}");
                }
            }
            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                report_doc.summary.total, report_doc.summary.passed, report_doc.summary.failed
            );

            if let Some(report_path) = report {
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(&report_path, report_doc.to_markdown())?;
                std::fs::write(report_path.with_extension("json"), report_doc.to_json())?;
            }

            if !report_doc.summary.all_passed() {
                return Err("Scenario verification failed".into());
            }
        }
        Command::Roundtrip { dir, capacity } => {
            let capacity = capacity.unwrap_or_else(sostdio_core::config::buffer_capacity);
            let summary = roundtrip::run_roundtrip(&dir, capacity)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            eprintln!("Validated {lines} lines: {} errors", errors.len());
            if !errors.is_empty() {
                return Err(format!("{} invalid log lines in {}", errors.len(), log.display()).into());
            }
        }
    }

    Ok(())
}
