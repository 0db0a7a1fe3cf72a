//! Fixture loading and management.
//!
//! A fixture file is a [`FixtureSet`]: a list of [`Scenario`]s, each of
//! which seeds an in-memory file system, optionally arms a fault plan, and
//! then drives one stream through a sequence of [`Step`]s. Every step
//! carries the rendered outcome it must produce.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sostdio_core::os::{FaultPlan, Whence};

use crate::error::HarnessError;

/// Path used for the scenario stream when a scenario does not name one.
pub const DEFAULT_SCENARIO_PATH: &str = "data.bin";

/// A collection of scenarios for one area of stream behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Behavior family (e.g. "buffering", "positioning").
    pub family: String,
    pub scenarios: Vec<Scenario>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Load one fixture file, or every `*.json` file of a directory in
    /// name order.
    pub fn load_all(path: &Path) -> Result<Vec<Self>, HarnessError> {
        if path.is_file() {
            return Ok(vec![Self::from_file(path)?]);
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(HarnessError::NoFixtures(path.to_path_buf()));
        }
        paths.iter().map(|p| Self::from_file(p)).collect()
    }
}

/// One stream session against a seeded in-memory file system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Behavioral property the scenario exercises.
    #[serde(default)]
    pub property: String,
    /// Path opened by `open` steps and inspected by `file` steps.
    #[serde(default = "default_path")]
    pub path: String,
    /// Files present before the first step, keyed by path.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Fault plan armed before the first step.
    #[serde(default)]
    pub faults: Option<FaultSpec>,
    /// Buffer capacity for streams opened by this scenario.
    #[serde(default)]
    pub capacity: Option<usize>,
    pub steps: Vec<Step>,
}

fn default_path() -> String {
    DEFAULT_SCENARIO_PATH.to_string()
}

/// Serializable mirror of [`FaultPlan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultSpec {
    pub fail_read_after: Option<usize>,
    pub fail_write_after: Option<usize>,
    pub zero_write_after: Option<usize>,
    pub max_write_chunk: Option<usize>,
    pub fail_seek: bool,
    pub fail_tell: bool,
    pub fail_close: bool,
    pub errno: Option<i32>,
}

impl From<&FaultSpec> for FaultPlan {
    fn from(spec: &FaultSpec) -> Self {
        FaultPlan {
            fail_read_after: spec.fail_read_after,
            fail_write_after: spec.fail_write_after,
            zero_write_after: spec.zero_write_after,
            max_write_chunk: spec.max_write_chunk,
            fail_seek: spec.fail_seek,
            fail_tell: spec.fail_tell,
            fail_close: spec.fail_close,
            errno: spec.errno,
        }
    }
}

/// One operation and the outcome it must render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: Op,
    pub expect: String,
}

/// Stream operations a scenario can perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Open {
        mode: String,
    },
    Close,
    ReadByte,
    WriteByte {
        byte: u8,
    },
    /// Bulk read of `count` elements of `size` bytes.
    Read {
        #[serde(default = "one")]
        size: usize,
        count: usize,
    },
    /// Bulk write of `data`, split into elements of `size` bytes.
    Write {
        data: String,
        #[serde(default = "one")]
        size: usize,
    },
    Flush,
    Seek {
        offset: i64,
        whence: SeekFrom,
    },
    Tell,
    IsEof,
    IsError,
    /// Current contents of the scenario file.
    File,
    /// Replace the fault plan (and reset its call counters).
    Faults {
        #[serde(default)]
        plan: FaultSpec,
    },
}

fn one() -> usize {
    1
}

impl Op {
    /// Snake-case name used in transcripts and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Op::Open { .. } => "open",
            Op::Close => "close",
            Op::ReadByte => "read_byte",
            Op::WriteByte { .. } => "write_byte",
            Op::Read { .. } => "read",
            Op::Write { .. } => "write",
            Op::Flush => "flush",
            Op::Seek { .. } => "seek",
            Op::Tell => "tell",
            Op::IsEof => "is_eof",
            Op::IsError => "is_error",
            Op::File => "file",
            Op::Faults { .. } => "faults",
        }
    }
}

/// Seek origin as spelled in fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekFrom {
    Set,
    Cur,
    End,
}

impl From<SeekFrom> for Whence {
    fn from(s: SeekFrom) -> Self {
        match s {
            SeekFrom::Set => Whence::Start,
            SeekFrom::Cur => Whence::Current,
            SeekFrom::End => Whence::End,
        }
    }
}
