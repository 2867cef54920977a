//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - source declarations (`SourceFileDescriptor`)
//! - typed flow observations (`FlowRecord`, `Provenance`)
//! - recorded anomalies (`ValidationDiagnostic`, `Severity`, `DiagnosticKind`)
//! - the assembled output (`Dataset`, `DatasetSummary`, `FileSummary`)

pub mod types;

pub use types::*;
