use std::path::PathBuf;

use thiserror::Error;

/// Structural pipeline failures.
///
/// Recoverable anomalies are not errors: they accumulate as
/// [`crate::domain::ValidationDiagnostic`]s and travel with the dataset.
#[derive(Debug, Error)]
pub enum Error {
    /// Conflicting or missing schema/descriptor setup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A source file could not be opened or decoded at all.
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A raw header could not be reconciled with the canonical schema.
    #[error("schema mismatch on column `{column}`: {reason}")]
    SchemaMismatch { column: String, reason: String },
}
