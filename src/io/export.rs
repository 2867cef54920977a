//! Export diagnostics and ingest accounting for downstream inspection tooling.
//!
//! Diagnostics go out as line-delimited JSON, one object per line, so stream
//! tools can consume them without holding the whole report.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{Dataset, ValidationDiagnostic};
use crate::error::Error;

fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write diagnostics as line-delimited JSON.
pub fn write_diagnostics_jsonl(
    path: &Path,
    diagnostics: &[ValidationDiagnostic],
) -> Result<(), Error> {
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut out = BufWriter::new(file);

    for diagnostic in diagnostics {
        let json = serde_json::to_string(diagnostic)
            .map_err(|e| io_error(path, std::io::Error::other(e)))?;
        writeln!(out, "{json}").map_err(|e| io_error(path, e))?;
    }

    out.flush().map_err(|e| io_error(path, e))
}

/// Write per-file ingest accounting to a CSV file.
///
/// Meant to be easy to consume in spreadsheets or downstream scripts.
pub fn write_file_summary_csv(path: &Path, dataset: &Dataset) -> Result<(), Error> {
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "path,day,scenario,rows_read,records,dropped,failed")
        .map_err(|e| io_error(path, e))?;

    for f in &dataset.summary.files {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            f.path.display(),
            f.day,
            f.scenario,
            f.rows_read,
            f.records,
            f.dropped,
            f.failed,
        )
        .map_err(|e| io_error(path, e))?;
    }

    out.flush().map_err(|e| io_error(path, e))
}
