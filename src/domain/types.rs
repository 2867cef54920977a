//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - used in-memory during assembly
//! - exported as line-delimited diagnostics reports
//! - consumed later by downstream inspection tooling

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::schema::SchemaDefinition;

/// Sentinel stored when a declared numeric feature has no usable value.
///
/// NaN compares unequal to itself; check with [`is_missing`], not `==`.
pub const MISSING: f64 = f64::NAN;

/// Whether a feature value is the missing sentinel.
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// One raw CSV file to ingest, with its provenance.
///
/// Declared at configuration time, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFileDescriptor {
    pub path: PathBuf,
    /// Capture day; the dataset is organized as one file per weekday session.
    pub day: Weekday,
    /// Traffic scenario staged during that session (e.g. "Benign", "DDoS").
    pub scenario: String,
    /// Coarse bracket on emitted records; deviation raises a warning.
    pub expected_records: Option<RangeInclusive<u64>>,
}

impl SourceFileDescriptor {
    pub fn new(path: impl Into<PathBuf>, day: Weekday, scenario: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            day,
            scenario: scenario.into(),
            expected_records: None,
        }
    }

    pub fn with_expected_records(mut self, range: RangeInclusive<u64>) -> Self {
        self.expected_records = Some(range);
        self
    }
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub day: Weekday,
    /// Shared across all records of one file.
    pub scenario: Arc<str>,
}

/// One bidirectional flow observation.
///
/// `values` is aligned with the schema's feature order: every declared
/// feature has a slot, possibly [`MISSING`]. Immutable after creation.
#[derive(Debug, Clone)]
pub struct FlowRecord {
    pub values: Vec<f64>,
    /// Ground-truth class; always a member of the schema's permitted set.
    pub label: String,
    pub provenance: Provenance,
}

impl FlowRecord {
    /// Look up a feature value by canonical column name.
    pub fn value(&self, schema: &SchemaDefinition, name: &str) -> Option<f64> {
        schema.feature_index(name).map(|idx| self.values[idx])
    }
}

/// How severe a diagnostic is.
///
/// `Blocking` means the affected data was dropped or is unsafe to trust;
/// whether that halts downstream use is the caller's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Blocking,
}

/// What kind of anomaly a diagnostic describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A declared numeric feature had no parseable value.
    MissingValue { column: String },
    /// A label outside the permitted vocabulary; the record was dropped.
    UnknownLabel { label: String },
    /// A row that could not be decoded as CSV.
    MalformedRow,
    /// A label the file's declared scenario does not permit.
    ScenarioLabelMismatch { label: String, scenario: String },
    /// Emitted-record count outside the descriptor's expected bracket.
    RecordCountAnomaly {
        records: u64,
        expected_min: u64,
        expected_max: u64,
    },
    /// The whole file failed ingestion (I/O or schema mismatch).
    FileFailed,
}

/// A recorded anomaly. Accumulated, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDiagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Originating source file.
    pub file: PathBuf,
    /// 1-based line number, when row context exists.
    pub line: Option<u64>,
    pub message: String,
}

/// Per-file ingest accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub path: PathBuf,
    pub day: Weekday,
    pub scenario: String,
    pub rows_read: u64,
    pub records: u64,
    pub dropped: u64,
    /// True when the file failed structurally and contributed nothing.
    pub failed: bool,
}

/// Aggregate metadata computed once at assembly time.
#[derive(Debug, Clone, Default)]
pub struct DatasetSummary {
    /// One entry per descriptor, in declared order.
    pub files: Vec<FileSummary>,
    pub label_counts: BTreeMap<String, u64>,
    pub day_counts: HashMap<Weekday, u64>,
    /// Missing-value occurrences per canonical feature name (non-zero only).
    pub missing_counts: BTreeMap<String, u64>,
    /// Records whose feature vector and label exactly repeat an earlier one.
    pub duplicate_records: u64,
    pub diagnostics: Vec<ValidationDiagnostic>,
}

/// The assembled, read-only record set.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: Arc<SchemaDefinition>,
    pub records: Vec<FlowRecord>,
    pub summary: DatasetSummary,
}

impl Dataset {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether any accumulated diagnostic is blocking.
    ///
    /// Gating on this is deliberately left to the caller; assembly never
    /// discards data wholesale on its own.
    pub fn has_blocking_diagnostics(&self) -> bool {
        self.summary
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Blocking)
    }
}
