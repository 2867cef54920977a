//! Terminal-friendly summaries of an assembled dataset.

use chrono::Weekday;

use crate::domain::{Dataset, Severity, ValidationDiagnostic};

/// Weekdays in capture order, for stable report output.
const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Format the full assembly summary (files + labels + diagnostics tally).
pub fn format_dataset_summary(dataset: &Dataset) -> String {
    let mut out = String::new();

    out.push_str("=== flowset - dataset assembly ===\n");
    out.push_str(&format!(
        "Records: {} | features: {} | duplicates: {}\n",
        dataset.len(),
        dataset.schema.feature_count(),
        dataset.summary.duplicate_records,
    ));

    out.push_str("\nFiles:\n");
    out.push_str(&format!(
        "{:<40} {:>4} {:<14} {:>10} {:>10} {:>8} {:<8}\n",
        "file", "day", "scenario", "rows", "records", "dropped", "status"
    ));
    for f in &dataset.summary.files {
        let name = f
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| f.path.display().to_string());
        out.push_str(&format!(
            "{:<40} {:>4} {:<14} {:>10} {:>10} {:>8} {:<8}\n",
            truncate(&name, 40),
            f.day,
            truncate(&f.scenario, 14),
            f.rows_read,
            f.records,
            f.dropped,
            if f.failed { "FAILED" } else { "ok" },
        ));
    }

    out.push_str("\nRecords per day:\n");
    for day in WEEK {
        if let Some(count) = dataset.summary.day_counts.get(&day) {
            out.push_str(&format!("  {day} {count:>10}\n"));
        }
    }

    out.push_str("\nLabel distribution:\n");
    let mut labels: Vec<(&String, &u64)> = dataset.summary.label_counts.iter().collect();
    labels.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (label, count) in labels {
        out.push_str(&format!("  {:<28} {count:>10}\n", truncate(label, 28)));
    }

    if !dataset.summary.missing_counts.is_empty() {
        out.push_str("\nMissing values (top 10 columns):\n");
        let mut missing: Vec<(&String, &u64)> = dataset.summary.missing_counts.iter().collect();
        missing.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (column, count) in missing.into_iter().take(10) {
            out.push_str(&format!("  {:<28} {count:>10}\n", truncate(column, 28)));
        }
    }

    let blocking = count_severity(&dataset.summary.diagnostics, Severity::Blocking);
    let warnings = count_severity(&dataset.summary.diagnostics, Severity::Warning);
    out.push_str(&format!(
        "\nDiagnostics: {blocking} blocking, {warnings} warning\n"
    ));

    out
}

/// Format diagnostics as one line each, capped at `limit` entries.
pub fn format_diagnostics(diagnostics: &[ValidationDiagnostic], limit: usize) -> String {
    let mut out = String::new();

    for diagnostic in diagnostics.iter().take(limit) {
        let severity = match diagnostic.severity {
            Severity::Warning => "warning",
            Severity::Blocking => "blocking",
        };
        let location = match diagnostic.line {
            Some(line) => format!("{}:{line}", diagnostic.file.display()),
            None => diagnostic.file.display().to_string(),
        };
        out.push_str(&format!("[{severity}] {location}: {}\n", diagnostic.message));
    }

    if diagnostics.len() > limit {
        out.push_str(&format!("... and {} more\n", diagnostics.len() - limit));
    }

    out
}

fn count_severity(diagnostics: &[ValidationDiagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
