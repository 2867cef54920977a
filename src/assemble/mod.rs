//! Dataset assembly: many per-file streams into one ordered record set.
//!
//! Design goals:
//! - **Order is contract**: cross-file record order is the declared descriptor
//!   order, also on the parallel path
//! - **Failure isolation**: an unreadable or irreconcilable file costs that
//!   file only; assembly fails only when nothing survives
//! - **Visibility over fail-fast**: blocking diagnostics ride along with the
//!   dataset; gating on them is the caller's policy

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::{Hash, Hasher};

use log::{info, warn};
use rayon::prelude::*;

use crate::domain::{
    Dataset, DatasetSummary, DiagnosticKind, FileSummary, FlowRecord, Severity,
    SourceFileDescriptor, ValidationDiagnostic, is_missing,
};
use crate::error::Error;
use crate::io::ingest::{IngestSummary, load};
use crate::schema::SchemaRegistry;

/// Which labels a scenario logically permits.
///
/// The benign label is permitted everywhere; scenarios absent from the table
/// are not checked at all.
#[derive(Debug, Clone)]
pub struct ScenarioPolicy {
    benign_label: String,
    allowed: BTreeMap<String, BTreeSet<String>>,
}

impl ScenarioPolicy {
    pub fn new(benign_label: impl Into<String>) -> Self {
        Self {
            benign_label: benign_label.into(),
            allowed: BTreeMap::new(),
        }
    }

    /// Declare the attack labels a scenario may carry.
    pub fn allow(mut self, scenario: &str, labels: &[&str]) -> Self {
        self.allowed.insert(
            scenario.to_string(),
            labels.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn permits(&self, scenario: &str, label: &str) -> bool {
        if label == self.benign_label {
            return true;
        }
        match self.allowed.get(scenario) {
            Some(labels) => labels.contains(label),
            None => true,
        }
    }
}

/// Knobs for one assembly run.
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Ingest files on worker threads. Each worker owns its batch until it is
    /// handed back; concatenation stays single-threaded and order-preserving.
    pub parallel: bool,
    /// Scenario→label coherence table; `None` disables the check.
    pub scenario_policy: Option<ScenarioPolicy>,
}

struct FileBatch {
    records: Vec<FlowRecord>,
    summary: IngestSummary,
}

fn ingest_file(
    registry: &SchemaRegistry,
    descriptor: &SourceFileDescriptor,
) -> Result<FileBatch, Error> {
    let mut reader = load(registry, descriptor)?;
    let records: Vec<FlowRecord> = reader.by_ref().collect();
    Ok(FileBatch {
        records,
        summary: reader.finish(),
    })
}

/// Assemble with default options (sequential, no coherence check).
pub fn assemble(
    registry: &SchemaRegistry,
    descriptors: &[SourceFileDescriptor],
) -> Result<Dataset, Error> {
    assemble_with(registry, descriptors, &AssembleOptions::default())
}

/// Assemble every descriptor, in declared order, into one `Dataset`.
///
/// Per-file structural failures become blocking diagnostics plus a failed
/// `FileSummary`; assembly itself fails only on an empty descriptor list or
/// when every file fails.
pub fn assemble_with(
    registry: &SchemaRegistry,
    descriptors: &[SourceFileDescriptor],
    options: &AssembleOptions,
) -> Result<Dataset, Error> {
    if descriptors.is_empty() {
        return Err(Error::Configuration(
            "no source files declared".to_string(),
        ));
    }
    let schema = registry.shared_schema()?;

    let outcomes: Vec<Result<FileBatch, Error>> = if options.parallel {
        descriptors
            .par_iter()
            .map(|d| ingest_file(registry, d))
            .collect()
    } else {
        descriptors.iter().map(|d| ingest_file(registry, d)).collect()
    };

    let mut records: Vec<FlowRecord> = Vec::new();
    let mut summary = DatasetSummary::default();
    let mut failed = 0usize;

    for (descriptor, outcome) in descriptors.iter().zip(outcomes) {
        match outcome {
            Ok(batch) => {
                summary.diagnostics.extend(batch.summary.diagnostics);

                if let Some(expected) = &descriptor.expected_records {
                    if !expected.contains(&batch.summary.emitted) {
                        summary.diagnostics.push(ValidationDiagnostic {
                            severity: Severity::Warning,
                            kind: DiagnosticKind::RecordCountAnomaly {
                                records: batch.summary.emitted,
                                expected_min: *expected.start(),
                                expected_max: *expected.end(),
                            },
                            file: descriptor.path.clone(),
                            line: None,
                            message: format!(
                                "{} records, expected {}..={}",
                                batch.summary.emitted,
                                expected.start(),
                                expected.end()
                            ),
                        });
                    }
                }

                if let Some(policy) = &options.scenario_policy {
                    check_scenario_coherence(descriptor, &batch.records, policy, &mut summary);
                }

                summary.files.push(FileSummary {
                    path: descriptor.path.clone(),
                    day: descriptor.day,
                    scenario: descriptor.scenario.clone(),
                    rows_read: batch.summary.rows_read,
                    records: batch.summary.emitted,
                    dropped: batch.summary.dropped,
                    failed: false,
                });
                records.extend(batch.records);
            }
            Err(err) => {
                warn!("{} failed ingestion: {err}", descriptor.path.display());
                failed += 1;
                summary.diagnostics.push(ValidationDiagnostic {
                    severity: Severity::Blocking,
                    kind: DiagnosticKind::FileFailed,
                    file: descriptor.path.clone(),
                    line: None,
                    message: err.to_string(),
                });
                summary.files.push(FileSummary {
                    path: descriptor.path.clone(),
                    day: descriptor.day,
                    scenario: descriptor.scenario.clone(),
                    rows_read: 0,
                    records: 0,
                    dropped: 0,
                    failed: true,
                });
            }
        }
    }

    if failed == descriptors.len() {
        return Err(Error::Configuration(format!(
            "all {failed} source files failed ingestion"
        )));
    }

    // Aggregates over the concatenated records.
    let mut missing_by_slot = vec![0u64; schema.feature_count()];
    let mut fingerprints: HashSet<u64> = HashSet::with_capacity(records.len());
    for record in &records {
        *summary.label_counts.entry(record.label.clone()).or_insert(0) += 1;
        *summary.day_counts.entry(record.provenance.day).or_insert(0) += 1;
        if !fingerprints.insert(record_fingerprint(record)) {
            summary.duplicate_records += 1;
        }
        for (slot, &value) in record.values.iter().enumerate() {
            if is_missing(value) {
                missing_by_slot[slot] += 1;
            }
        }
    }
    for (name, count) in schema.feature_names().zip(missing_by_slot) {
        if count > 0 {
            summary.missing_counts.insert(name.to_string(), count);
        }
    }

    info!(
        "assembled {} records from {}/{} files",
        records.len(),
        descriptors.len() - failed,
        descriptors.len()
    );

    Ok(Dataset {
        schema,
        records,
        summary,
    })
}

/// One blocking diagnostic per distinct foreign (file, label) pair.
fn check_scenario_coherence(
    descriptor: &SourceFileDescriptor,
    records: &[FlowRecord],
    policy: &ScenarioPolicy,
    summary: &mut DatasetSummary,
) {
    let mut tallies: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records {
        *tallies.entry(record.label.as_str()).or_insert(0) += 1;
    }
    for (label, count) in tallies {
        if !policy.permits(&descriptor.scenario, label) {
            summary.diagnostics.push(ValidationDiagnostic {
                severity: Severity::Blocking,
                kind: DiagnosticKind::ScenarioLabelMismatch {
                    label: label.to_string(),
                    scenario: descriptor.scenario.clone(),
                },
                file: descriptor.path.clone(),
                line: None,
                message: format!(
                    "label `{label}` ({count} records) is not expected under scenario `{}`",
                    descriptor.scenario
                ),
            });
        }
    }
}

fn record_fingerprint(record: &FlowRecord) -> u64 {
    let mut hasher = DefaultHasher::new();
    record.label.hash(&mut hasher);
    for &value in &record.values {
        value.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use std::path::Path;

    use crate::schema::{ColumnSpec, SchemaDefinition};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::with_schema(
            SchemaDefinition::new(
                vec![
                    ColumnSpec::float("flow duration"),
                    ColumnSpec::nullable_float("flow bytes/s"),
                    ColumnSpec::label("label"),
                ],
                ["BENIGN", "DDoS", "PortScan"],
            )
            .unwrap(),
        )
    }

    fn descriptor(path: &Path, day: Weekday, scenario: &str) -> SourceFileDescriptor {
        SourceFileDescriptor::new(path, day, scenario)
    }

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn two_files_concatenate_in_descriptor_order() {
        let monday = write_file("flow duration,flow bytes/s,label\n1.0,1.0,BENIGN\n2.0,2.0,BENIGN\n");
        let friday = write_file("flow duration,flow bytes/s,label\n3.0,3.0,DDoS\n");

        let dataset = assemble(
            &registry(),
            &[
                descriptor(monday.path(), Weekday::Mon, "Benign"),
                descriptor(friday.path(), Weekday::Fri, "DDoS"),
            ],
        )
        .unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.records[0].values[0], 1.0);
        assert_eq!(dataset.records[2].values[0], 3.0);
        assert_eq!(dataset.summary.label_counts["BENIGN"], 2);
        assert_eq!(dataset.summary.label_counts["DDoS"], 1);
        assert_eq!(dataset.summary.day_counts[&Weekday::Mon], 2);
        assert_eq!(dataset.summary.files.len(), 2);
        assert!(!dataset.has_blocking_diagnostics());
    }

    #[test]
    fn total_count_is_sum_of_emitted_minus_drops() {
        let monday = write_file(
            "flow duration,flow bytes/s,label\n1.0,1.0,BENIGN\n2.0,2.0,NotALabel\n3.0,3.0,BENIGN\n",
        );
        let dataset = assemble(
            &registry(),
            &[descriptor(monday.path(), Weekday::Mon, "Benign")],
        )
        .unwrap();

        assert_eq!(dataset.len(), 2);
        let f = &dataset.summary.files[0];
        assert_eq!(f.rows_read, 3);
        assert_eq!(f.records, 2);
        assert_eq!(f.dropped, 1);
        assert!(dataset.has_blocking_diagnostics());
    }

    #[test]
    fn one_unreconcilable_file_does_not_sink_the_rest() {
        let good = write_file("flow duration,flow bytes/s,label\n1.0,1.0,BENIGN\n");
        let bad = write_file("flow duration,flow bytes/s,extra column,label\n1.0,1.0,9.9,BENIGN\n");

        let dataset = assemble(
            &registry(),
            &[
                descriptor(bad.path(), Weekday::Mon, "Benign"),
                descriptor(good.path(), Weekday::Tue, "Benign"),
            ],
        )
        .unwrap();

        assert_eq!(dataset.len(), 1);
        assert!(dataset.summary.files[0].failed);
        assert!(!dataset.summary.files[1].failed);

        let file_failures: Vec<_> = dataset
            .summary
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::FileFailed)
            .collect();
        assert_eq!(file_failures.len(), 1);
        assert_eq!(file_failures[0].file, bad.path());
        assert_eq!(file_failures[0].severity, Severity::Blocking);
    }

    #[test]
    fn all_files_failing_is_a_configuration_error() {
        let err = assemble(
            &registry(),
            &[
                descriptor(Path::new("/nonexistent/a.csv"), Weekday::Mon, "Benign"),
                descriptor(Path::new("/nonexistent/b.csv"), Weekday::Tue, "Benign"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn empty_descriptor_list_is_a_configuration_error() {
        let err = assemble(&registry(), &[]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn record_count_anomaly_warns() {
        let monday = write_file("flow duration,flow bytes/s,label\n1.0,1.0,BENIGN\n");
        let dataset = assemble(
            &registry(),
            &[descriptor(monday.path(), Weekday::Mon, "Benign").with_expected_records(10..=20)],
        )
        .unwrap();

        let anomaly = dataset
            .summary
            .diagnostics
            .iter()
            .find(|d| {
                matches!(d.kind, DiagnosticKind::RecordCountAnomaly { .. })
            })
            .unwrap();
        assert_eq!(anomaly.severity, Severity::Warning);
        assert_eq!(
            anomaly.kind,
            DiagnosticKind::RecordCountAnomaly {
                records: 1,
                expected_min: 10,
                expected_max: 20,
            }
        );
    }

    #[test]
    fn scenario_policy_flags_foreign_labels() {
        let monday = write_file(
            "flow duration,flow bytes/s,label\n1.0,1.0,BENIGN\n2.0,2.0,DDoS\n3.0,3.0,DDoS\n",
        );
        let options = AssembleOptions {
            parallel: false,
            scenario_policy: Some(ScenarioPolicy::new("BENIGN").allow("Benign", &[])),
        };
        let dataset = assemble_with(
            &registry(),
            &[descriptor(monday.path(), Weekday::Mon, "Benign")],
            &options,
        )
        .unwrap();

        // Records survive; the incoherence is surfaced, not silently dropped.
        assert_eq!(dataset.len(), 3);
        let mismatch = dataset
            .summary
            .diagnostics
            .iter()
            .find(|d| matches!(d.kind, DiagnosticKind::ScenarioLabelMismatch { .. }))
            .unwrap();
        assert_eq!(mismatch.severity, Severity::Blocking);
        assert!(mismatch.message.contains("2 records"));
    }

    #[test]
    fn unknown_scenario_is_not_checked() {
        let policy = ScenarioPolicy::new("BENIGN").allow("PortScan", &["PortScan"]);
        assert!(policy.permits("PortScan", "PortScan"));
        assert!(!policy.permits("PortScan", "DDoS"));
        assert!(policy.permits("SomethingNew", "DDoS"));
        assert!(policy.permits("PortScan", "BENIGN"));
    }

    #[test]
    fn parallel_matches_sequential_order() {
        let monday = write_file("flow duration,flow bytes/s,label\n1.0,1.0,BENIGN\n");
        let tuesday = write_file("flow duration,flow bytes/s,label\n2.0,2.0,BENIGN\n");
        let friday = write_file("flow duration,flow bytes/s,label\n3.0,3.0,DDoS\n");
        let descriptors = [
            descriptor(monday.path(), Weekday::Mon, "Benign"),
            descriptor(tuesday.path(), Weekday::Tue, "Benign"),
            descriptor(friday.path(), Weekday::Fri, "DDoS"),
        ];

        let registry = registry();
        let sequential = assemble(&registry, &descriptors).unwrap();
        let parallel = assemble_with(
            &registry,
            &descriptors,
            &AssembleOptions {
                parallel: true,
                scenario_policy: None,
            },
        )
        .unwrap();

        assert_eq!(sequential.len(), parallel.len());
        for (a, b) in sequential.records.iter().zip(&parallel.records) {
            assert_eq!(a.label, b.label);
            assert_eq!(a.values[0].to_bits(), b.values[0].to_bits());
        }
    }

    #[test]
    fn audit_counts_duplicates_and_missingness() {
        let monday = write_file(
            "flow duration,flow bytes/s,label\n1.0,1.0,BENIGN\n1.0,1.0,BENIGN\n,2.0,BENIGN\n",
        );
        let dataset = assemble(
            &registry(),
            &[descriptor(monday.path(), Weekday::Mon, "Benign")],
        )
        .unwrap();

        assert_eq!(dataset.summary.duplicate_records, 1);
        assert_eq!(dataset.summary.missing_counts["flow duration"], 1);
        assert!(!dataset.summary.missing_counts.contains_key("flow bytes/s"));
    }
}
