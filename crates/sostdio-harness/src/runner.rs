//! Scenario execution engine.
//!
//! Each scenario runs against a fresh [`MemFs`] so fault plans and file
//! contents never leak between scenarios. Every step's outcome is
//! rendered to a short string:
//!
//! | outcome | rendering |
//! |---|---|
//! | success without a value | `ok` |
//! | a byte | the byte, ASCII-escaped (`A`, `\n`, `\xff`) |
//! | bulk read | `<elements> "<bytes>"` |
//! | bulk write, `tell` | the number |
//! | `is_eof` / `is_error` | `true` / `false` |
//! | `file` | `"<bytes>"`, or `<missing>` |
//! | failure | `err:<Kind>` or `err:<Kind>(<errno>)` |

use std::time::Instant;

use sha2::{Digest, Sha256};
use sostdio_core::metrics::global_metrics;
use sostdio_core::os::{FaultPlan, MemFile, MemFs};
use sostdio_core::{StdioError, Stream, config};

use crate::diff;
use crate::fixtures::{FixtureSet, Op, Scenario};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
use crate::verify::VerificationResult;

/// One executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub op: &'static str,
    pub actual: String,
}

/// Everything observed while executing a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub steps: Vec<StepRecord>,
    /// SHA-256 of the scenario file after the stream is gone.
    pub file_sha256: Option<String>,
    /// Errno of the last failing step, if any step failed with one.
    pub last_errno: Option<i32>,
}

/// Runs fixture sets and collects verification results.
pub struct ScenarioRunner {
    /// Name of the verification campaign.
    pub campaign: String,
}

impl ScenarioRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
        }
    }

    /// Run every scenario in a set.
    pub fn run(&self, set: &FixtureSet) -> Vec<VerificationResult> {
        set.scenarios
            .iter()
            .map(|sc| verify_scenario(&set.family, sc, &execute_scenario(sc)))
            .collect()
    }

    /// Run every scenario in a set, logging one entry per scenario plus a
    /// start and an end marker.
    pub fn run_logged(
        &self,
        set: &FixtureSet,
        log: &mut LogEmitter,
    ) -> std::io::Result<Vec<VerificationResult>> {
        log.emit_entry(
            LogEntry::new(String::new(), LogLevel::Info, "fixture_set_start").with_details(
                serde_json::json!({
                    "campaign": self.campaign,
                    "family": set.family,
                    "scenarios": set.scenarios.len(),
                }),
            ),
        )?;

        let mut results = Vec::with_capacity(set.scenarios.len());
        for sc in &set.scenarios {
            let started = Instant::now();
            let run = execute_scenario(sc);
            let result = verify_scenario(&set.family, sc, &run);

            let (level, outcome) = if result.passed {
                (LogLevel::Info, Outcome::Pass)
            } else {
                (LogLevel::Error, Outcome::Fail)
            };
            let mut entry = LogEntry::new(String::new(), level, "scenario_result")
                .with_scenario(&result.case_name)
                .with_outcome(outcome)
                .with_duration_ms(started.elapsed().as_millis() as u64)
                .with_details(serde_json::json!({
                    "property": sc.property,
                    "steps": run.steps.len(),
                    "file_sha256": run.file_sha256,
                    "diff": result.diff,
                    "metrics": global_metrics().snapshot().to_string(),
                }));
            if let Some(errno) = run.last_errno {
                entry = entry.with_errno(errno);
            }
            log.emit_entry(entry)?;
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.passed).count();
        let outcome = if failed == 0 { Outcome::Pass } else { Outcome::Fail };
        log.emit_entry(
            LogEntry::new(String::new(), LogLevel::Info, "fixture_set_end")
                .with_outcome(outcome)
                .with_details(serde_json::json!({
                    "family": set.family,
                    "total": results.len(),
                    "failed": failed,
                })),
        )?;
        Ok(results)
    }
}

fn verify_scenario(family: &str, sc: &Scenario, run: &ScenarioRun) -> VerificationResult {
    let expected = sc
        .steps
        .iter()
        .map(|s| format!("{} => {}", s.op.name(), s.expect))
        .collect::<Vec<_>>()
        .join("\n");
    let actual = run
        .steps
        .iter()
        .map(|s| format!("{} => {}", s.op, s.actual))
        .collect::<Vec<_>>()
        .join("\n");
    let passed = expected == actual;
    VerificationResult {
        case_name: format!("{family}/{}", sc.name),
        property: sc.property.clone(),
        passed,
        diff: (!passed).then(|| diff::render_diff(&expected, &actual)),
        expected,
        actual,
        file_sha256: run.file_sha256.clone(),
    }
}

/// Execute one scenario on a fresh in-memory file system.
#[must_use]
pub fn execute_scenario(sc: &Scenario) -> ScenarioRun {
    let fs = MemFs::new();
    for (path, contents) in &sc.files {
        fs.insert(path, contents.as_bytes());
    }
    if let Some(spec) = &sc.faults {
        fs.set_faults(FaultPlan::from(spec));
    }
    let capacity = sc.capacity.unwrap_or_else(config::buffer_capacity);

    let mut exec = Executor {
        fs,
        path: sc.path.clone(),
        capacity,
        stream: None,
        last_errno: None,
    };
    let steps = sc
        .steps
        .iter()
        .map(|step| StepRecord {
            op: step.op.name(),
            actual: exec.apply(&step.op),
        })
        .collect();

    // Flush and release whatever the scenario left open.
    if let Some(stream) = exec.stream.take() {
        let _ = stream.close();
    }
    let file_sha256 = exec.fs.contents(&exec.path).map(|c| sha256_hex(&c));
    ScenarioRun {
        steps,
        file_sha256,
        last_errno: exec.last_errno,
    }
}

struct Executor {
    fs: MemFs,
    path: String,
    capacity: usize,
    stream: Option<Stream<MemFile>>,
    last_errno: Option<i32>,
}

impl Executor {
    fn apply(&mut self, op: &Op) -> String {
        match op {
            Op::Open { mode } => {
                if self.stream.is_some() {
                    return "err:AlreadyOpen".to_string();
                }
                match Stream::open_in(&self.fs, &self.path, mode, self.capacity) {
                    Ok(s) => {
                        self.stream = Some(s);
                        "ok".to_string()
                    }
                    Err(e) => self.render_err(&e),
                }
            }
            Op::Close => match self.stream.take() {
                Some(s) => self.render_unit(s.close()),
                None => no_stream(),
            },
            Op::File => match self.fs.contents(&self.path) {
                Some(c) => format!("\"{}\"", c.escape_ascii()),
                None => "<missing>".to_string(),
            },
            Op::Faults { plan } => {
                self.fs.set_faults(FaultPlan::from(plan));
                "ok".to_string()
            }
            _ => {
                let Some(mut s) = self.stream.take() else {
                    return no_stream();
                };
                let out = self.apply_to_stream(&mut s, op);
                self.stream = Some(s);
                out
            }
        }
    }

    fn apply_to_stream(&mut self, s: &mut Stream<MemFile>, op: &Op) -> String {
        match op {
            Op::ReadByte => match s.read_byte() {
                Ok(b) => [b].escape_ascii().to_string(),
                Err(e) => self.render_err(&e),
            },
            Op::WriteByte { byte } => match s.write_byte(*byte) {
                Ok(b) => [b].escape_ascii().to_string(),
                Err(e) => self.render_err(&e),
            },
            Op::Read { size, count } => {
                let Some(total) = size.checked_mul(*count) else {
                    return "err:Overflow".to_string();
                };
                let mut dest = vec![0u8; total];
                let n = s.read_items(&mut dest, *size, *count);
                format!("{n} \"{}\"", dest[..n * size].escape_ascii())
            }
            Op::Write { data, size } => {
                let bytes = data.as_bytes();
                let count = bytes.len().checked_div(*size).unwrap_or(0);
                s.write_items(bytes, *size, count).to_string()
            }
            Op::Flush => self.render_unit(s.flush()),
            Op::Seek { offset, whence } => self.render_unit(s.seek(*offset, (*whence).into())),
            Op::Tell => match s.tell() {
                Ok(pos) => pos.to_string(),
                Err(e) => self.render_err(&e),
            },
            Op::IsEof => s.is_eof().to_string(),
            Op::IsError => s.is_error().to_string(),
            Op::Open { .. } | Op::Close | Op::File | Op::Faults { .. } => {
                unreachable!("handled without a stream borrow")
            }
        }
    }

    fn render_unit(&mut self, r: Result<(), StdioError>) -> String {
        match r {
            Ok(()) => "ok".to_string(),
            Err(e) => self.render_err(&e),
        }
    }

    fn render_err(&mut self, e: &StdioError) -> String {
        match e.errno() {
            0 => format!("err:{}", e.kind_name()),
            errno => {
                self.last_errno = Some(errno);
                format!("err:{}({errno})", e.kind_name())
            }
        }
    }
}

fn no_stream() -> String {
    "err:NoStream".to_string()
}

/// Lowercase hex SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{SeekFrom, Step};

    fn step(op: Op, expect: &str) -> Step {
        Step {
            op,
            expect: expect.to_string(),
        }
    }

    fn scenario(steps: Vec<Step>) -> Scenario {
        Scenario {
            name: "unit".to_string(),
            property: String::new(),
            path: "f".to_string(),
            files: Default::default(),
            faults: None,
            capacity: Some(4),
            steps,
        }
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn passing_scenario_renders_each_step() {
        let sc = scenario(vec![
            step(Op::Open { mode: "w+".into() }, "ok"),
            step(Op::WriteByte { byte: b'A' }, "A"),
            step(
                Op::Write {
                    data: "BC".into(),
                    size: 1,
                },
                "2",
            ),
            step(Op::Tell, "3"),
            step(
                Op::Seek {
                    offset: 0,
                    whence: SeekFrom::Set,
                },
                "ok",
            ),
            step(Op::Read { size: 1, count: 5 }, "3 \"ABC\""),
            step(Op::IsEof, "true"),
            step(Op::Close, "ok"),
            step(Op::File, "\"ABC\""),
        ]);
        let run = execute_scenario(&sc);
        let results = verify_scenario("unit", &sc, &run);
        assert!(results.passed, "{:?}", results.diff);
        assert_eq!(run.file_sha256, Some(sha256_hex(b"ABC")));
        assert_eq!(run.last_errno, None);
    }

    #[test]
    fn mismatch_produces_diff() {
        let sc = scenario(vec![
            step(Op::Open { mode: "r".into() }, "ok"),
            step(Op::ReadByte, "A"),
        ]);
        let run = execute_scenario(&sc);
        let result = verify_scenario("unit", &sc, &run);
        assert!(!result.passed);
        assert_eq!(run.steps[0].actual, "err:OpenFailed(2)");
        assert_eq!(run.steps[1].actual, "err:NoStream");
        assert!(result.diff.unwrap().contains("@@ step 1 @@"));
        assert_eq!(run.file_sha256, None);
        assert_eq!(run.last_errno, Some(2));
    }

    #[test]
    fn unclosed_stream_is_flushed_before_hashing() {
        let sc = scenario(vec![
            step(Op::Open { mode: "w".into() }, "ok"),
            step(Op::WriteByte { byte: b'z' }, "z"),
        ]);
        let run = execute_scenario(&sc);
        assert_eq!(run.file_sha256, Some(sha256_hex(b"z")));
    }

    #[test]
    fn second_open_is_refused() {
        let sc = scenario(vec![
            step(Op::Open { mode: "w".into() }, "ok"),
            step(Op::Open { mode: "w".into() }, "err:AlreadyOpen"),
        ]);
        let run = execute_scenario(&sc);
        assert_eq!(run.steps[1].actual, "err:AlreadyOpen");
    }

    #[test]
    fn non_printable_bytes_are_escaped() {
        let mut sc = scenario(vec![
            step(Op::Open { mode: "r".into() }, "ok"),
            step(Op::ReadByte, "\\n"),
        ]);
        sc.files.insert("f".into(), "\n".into());
        let run = execute_scenario(&sc);
        assert_eq!(run.steps[1].actual, "\\n");
    }
}
