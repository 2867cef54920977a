//! CSV ingest: one raw capture file into typed flow records.
//!
//! This module is responsible for turning a drifted per-day capture CSV into
//! a clean stream of `FlowRecord`s that are safe to assemble.
//!
//! Design goals:
//! - **Lazy**: rows stream through an iterator; a file is never materialized
//!   wholesale here
//! - **Restartable**: re-reading means calling `load` again; the reader keeps
//!   no shared cursor state
//! - **Row-level tolerance**: parse anomalies become diagnostics, not errors;
//!   only structural failures (unreadable file, irreconcilable header) abort
//! - **Separation of concerns**: no cross-file logic here

use std::fs::File;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord};
use log::debug;

use crate::domain::{
    DiagnosticKind, FlowRecord, MISSING, Provenance, Severity, SourceFileDescriptor,
    ValidationDiagnostic,
};
use crate::error::Error;
use crate::schema::{BindingTarget, HeaderMapping, SchemaDefinition, SchemaRegistry, canonicalize};

/// Counters and diagnostics left over after a reader is drained.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub rows_read: u64,
    pub emitted: u64,
    pub dropped: u64,
    pub diagnostics: Vec<ValidationDiagnostic>,
}

/// Lazy, finite record stream over one source file.
///
/// Obtained from [`load`]; drain it with the `Iterator` impl, then call
/// [`FlowReader::finish`] to collect the accounting for the pass.
#[derive(Debug)]
pub struct FlowReader {
    reader: csv::Reader<File>,
    schema: Arc<SchemaDefinition>,
    mapping: HeaderMapping,
    row: StringRecord,
    descriptor: SourceFileDescriptor,
    provenance: Provenance,
    rows_read: u64,
    emitted: u64,
    dropped: u64,
    diagnostics: Vec<ValidationDiagnostic>,
}

/// Open one source file and reconcile its header against the registry.
///
/// The header is normalized exactly once; every subsequent row is routed
/// through the resulting mapping. Open and decode failures are fatal
/// ([`Error::Io`]); an unreconcilable header is fatal for this file
/// ([`Error::SchemaMismatch`]).
pub fn load(
    registry: &SchemaRegistry,
    descriptor: &SourceFileDescriptor,
) -> Result<FlowReader, Error> {
    let schema = registry.shared_schema()?;

    let file = File::open(&descriptor.path).map_err(|source| Error::Io {
        path: descriptor.path.clone(),
        source,
    })?;

    debug!("ingesting {}", descriptor.path.display());

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let raw_header = reader
        .headers()
        .map_err(|e| Error::Io {
            path: descriptor.path.clone(),
            source: std::io::Error::other(e),
        })?
        .clone();

    let header: Vec<&str> = raw_header.iter().collect();
    let mapping = schema.reconcile_header(&header)?;

    Ok(FlowReader {
        reader,
        schema,
        mapping,
        row: StringRecord::new(),
        provenance: Provenance {
            day: descriptor.day,
            scenario: Arc::from(descriptor.scenario.as_str()),
        },
        descriptor: descriptor.clone(),
        rows_read: 0,
        emitted: 0,
        dropped: 0,
        diagnostics: Vec::new(),
    })
}

impl FlowReader {
    /// The descriptor this reader was opened for.
    pub fn descriptor(&self) -> &SourceFileDescriptor {
        &self.descriptor
    }

    /// Diagnostics accumulated so far.
    pub fn diagnostics(&self) -> &[ValidationDiagnostic] {
        &self.diagnostics
    }

    /// Consume the reader, returning the accounting for this pass.
    pub fn finish(self) -> IngestSummary {
        IngestSummary {
            rows_read: self.rows_read,
            emitted: self.emitted,
            dropped: self.dropped,
            diagnostics: self.diagnostics,
        }
    }

    /// Whether the current row buffer is a repeat of the header.
    ///
    /// Compared through `canonicalize` rather than byte equality: interior
    /// repeats vary in padding, and the reader strips the file-leading BOM
    /// from the stored header. Data rows bail on the first cell, so this
    /// stays cheap.
    fn is_header_repeat(&self) -> bool {
        for (pos, binding) in self.mapping.bindings().iter().enumerate() {
            if let Some(name) = &binding.canonical {
                let cell = self.row.get(pos).unwrap_or("");
                if canonicalize(cell) != *name {
                    return false;
                }
            }
        }
        true
    }

    fn diagnose(&mut self, severity: Severity, kind: DiagnosticKind, line: Option<u64>, message: String) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            kind,
            file: self.descriptor.path.clone(),
            line,
            message,
        });
    }

    /// Parse the current row buffer, or `None` when the record was dropped.
    fn parse_row(&mut self, line: Option<u64>) -> Option<FlowRecord> {
        let mut values = vec![MISSING; self.schema.feature_count()];
        let mut label = String::new();
        let mut warnings: Vec<(DiagnosticKind, String)> = Vec::new();

        for (pos, binding) in self.mapping.bindings().iter().enumerate() {
            let cell = self.row.get(pos).unwrap_or("");
            match binding.target {
                BindingTarget::Ignored => {}
                BindingTarget::Label => label = cell.to_string(),
                BindingTarget::Feature { index, nullable } => {
                    if cell.is_empty() {
                        if !nullable {
                            let column = binding.canonical.clone().unwrap_or_default();
                            warnings.push((
                                DiagnosticKind::MissingValue { column: column.clone() },
                                format!("empty value in `{column}`"),
                            ));
                        }
                    } else {
                        match cell.parse::<f64>() {
                            Ok(v) => values[index] = v,
                            Err(_) => {
                                let column = binding.canonical.clone().unwrap_or_default();
                                warnings.push((
                                    DiagnosticKind::MissingValue { column: column.clone() },
                                    format!("unparseable numeric value `{cell}` in `{column}`"),
                                ));
                            }
                        }
                    }
                }
            }
        }

        if self.row.len() > self.mapping.bindings().len() {
            warnings.push((
                DiagnosticKind::MalformedRow,
                format!(
                    "row has {} fields, header declares {}",
                    self.row.len(),
                    self.mapping.bindings().len()
                ),
            ));
        }

        for (kind, message) in warnings {
            self.diagnose(Severity::Warning, kind, line, message);
        }

        if !self.schema.permits_label(&label) {
            self.dropped += 1;
            self.diagnose(
                Severity::Blocking,
                DiagnosticKind::UnknownLabel { label: label.clone() },
                line,
                format!("label `{label}` outside the permitted set; record dropped"),
            );
            return None;
        }

        self.emitted += 1;
        Some(FlowRecord {
            values,
            label,
            provenance: self.provenance.clone(),
        })
    }
}

impl Iterator for FlowReader {
    type Item = FlowRecord;

    fn next(&mut self) -> Option<FlowRecord> {
        loop {
            match self.reader.read_record(&mut self.row) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    let line = e.position().map(|p| p.line());
                    self.diagnose(
                        Severity::Warning,
                        DiagnosticKind::MalformedRow,
                        line,
                        format!("CSV decode error: {e}"),
                    );
                    continue;
                }
            }

            self.rows_read += 1;
            let line = self.row.position().map(|p| p.line());

            // Interior repeats of the header and all-empty rows are known
            // artifacts of concatenated captures; skipped without diagnostic.
            if self.row.iter().all(str::is_empty) {
                self.rows_read -= 1;
                continue;
            }
            if self.is_header_repeat() {
                self.rows_read -= 1;
                continue;
            }

            if let Some(record) = self.parse_row(line) {
                return Some(record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use std::path::Path;

    use crate::domain::is_missing;
    use crate::schema::{ColumnSpec, SchemaDefinition};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::with_schema(
            SchemaDefinition::new(
                vec![
                    ColumnSpec::float("flow duration"),
                    ColumnSpec::nullable_float("flow bytes/s"),
                    ColumnSpec::label("label"),
                ],
                ["BENIGN", "DDoS", "Infiltration"],
            )
            .unwrap(),
        )
    }

    fn descriptor(path: &Path) -> SourceFileDescriptor {
        SourceFileDescriptor::new(path, Weekday::Mon, "Benign")
    }

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn clean_benign_row_emits_without_diagnostics() {
        let file = write_file("flow duration,flow bytes/s,label\n120.5,33.1,BENIGN\n");
        let mut reader = load(&registry(), &descriptor(file.path())).unwrap();

        let records: Vec<FlowRecord> = reader.by_ref().collect();
        let summary = reader.finish();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "BENIGN");
        assert_eq!(records[0].values, vec![120.5, 33.1]);
        assert_eq!(records[0].provenance.day, Weekday::Mon);
        assert!(summary.diagnostics.is_empty());
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.dropped, 0);
    }

    #[test]
    fn header_only_file_yields_nothing() {
        let file = write_file("flow duration,flow bytes/s,label\n");
        let mut reader = load(&registry(), &descriptor(file.path())).unwrap();

        assert!(reader.by_ref().next().is_none());
        let summary = reader.finish();
        assert_eq!(summary.rows_read, 0);
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn misspelled_label_drops_record_with_blocking_diagnostic() {
        let file = write_file(
            "flow duration,flow bytes/s,label\n1.0,2.0,Infultration\n3.0,4.0,Infiltration\n",
        );
        let mut reader = load(&registry(), &descriptor(file.path())).unwrap();

        let records: Vec<FlowRecord> = reader.by_ref().collect();
        let summary = reader.finish();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "Infiltration");
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.diagnostics.len(), 1);

        let diag = &summary.diagnostics[0];
        assert_eq!(diag.severity, Severity::Blocking);
        assert_eq!(
            diag.kind,
            DiagnosticKind::UnknownLabel {
                label: "Infultration".to_string()
            }
        );
        assert_eq!(diag.file, file.path());
        assert_eq!(diag.line, Some(2));
    }

    #[test]
    fn unparseable_numeric_becomes_missing_with_warning() {
        let file = write_file("flow duration,flow bytes/s,label\nbogus,2.0,BENIGN\n");
        let mut reader = load(&registry(), &descriptor(file.path())).unwrap();

        let records: Vec<FlowRecord> = reader.by_ref().collect();
        let summary = reader.finish();

        assert_eq!(records.len(), 1);
        assert!(is_missing(records[0].values[0]));
        assert_eq!(records[0].values[1], 2.0);
        assert_eq!(summary.diagnostics.len(), 1);
        assert_eq!(summary.diagnostics[0].severity, Severity::Warning);
        assert_eq!(
            summary.diagnostics[0].kind,
            DiagnosticKind::MissingValue {
                column: "flow duration".to_string()
            }
        );
    }

    #[test]
    fn infinity_and_nan_cells_parse_without_diagnostic() {
        // The published rate columns literally contain `Infinity` and `NaN`;
        // both are valid f64 spellings, so no warning is raised.
        let file = write_file("flow duration,flow bytes/s,label\n1.0,Infinity,BENIGN\n2.0,NaN,BENIGN\n");
        let mut reader = load(&registry(), &descriptor(file.path())).unwrap();

        let records: Vec<FlowRecord> = reader.by_ref().collect();
        let summary = reader.finish();

        assert_eq!(records.len(), 2);
        assert!(records[0].values[1].is_infinite());
        assert!(is_missing(records[1].values[1]));
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn nullable_empty_cell_is_silent_non_nullable_warns() {
        let file = write_file("flow duration,flow bytes/s,label\n,,BENIGN\n");
        let mut reader = load(&registry(), &descriptor(file.path())).unwrap();

        let records: Vec<FlowRecord> = reader.by_ref().collect();
        let summary = reader.finish();

        assert_eq!(records.len(), 1);
        assert!(is_missing(records[0].values[0]));
        assert!(is_missing(records[0].values[1]));
        // Only the non-nullable `flow duration` warns.
        assert_eq!(summary.diagnostics.len(), 1);
        assert_eq!(
            summary.diagnostics[0].kind,
            DiagnosticKind::MissingValue {
                column: "flow duration".to_string()
            }
        );
    }

    #[test]
    fn interior_header_repeats_and_blank_rows_skip_silently() {
        let file = write_file(
            "flow duration,flow bytes/s,label\n1.0,2.0,BENIGN\nflow duration,flow bytes/s,label\n,,\n3.0,4.0,DDoS\n",
        );
        let mut reader = load(&registry(), &descriptor(file.path())).unwrap();

        let records: Vec<FlowRecord> = reader.by_ref().collect();
        let summary = reader.finish();

        assert_eq!(records.len(), 2);
        assert_eq!(summary.rows_read, 2);
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn reload_yields_identical_sequence() {
        let file = write_file(
            "flow duration,flow bytes/s,label\n1.0,2.0,BENIGN\n3.0,Infinity,DDoS\n",
        );
        let registry = registry();
        let descriptor = descriptor(file.path());

        let first: Vec<FlowRecord> = load(&registry, &descriptor).unwrap().collect();
        let second: Vec<FlowRecord> = load(&registry, &descriptor).unwrap().collect();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.label, b.label);
            let bits_a: Vec<u64> = a.values.iter().map(|v| v.to_bits()).collect();
            let bits_b: Vec<u64> = b.values.iter().map(|v| v.to_bits()).collect();
            assert_eq!(bits_a, bits_b);
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load(
            &registry(),
            &descriptor(Path::new("/nonexistent/monday.csv")),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn unreconcilable_header_is_a_schema_mismatch() {
        let file = write_file("flow duration,mystery,label\n1.0,2.0,BENIGN\n");
        let err = load(&registry(), &descriptor(file.path())).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }
}
