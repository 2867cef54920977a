//! Known-dataset presets, file discovery, and synthetic sample generation.

use std::path::{Path, PathBuf};

use crate::error::Error;

pub mod cic;
pub mod sample;

pub use sample::*;

/// Discover CSV files in a directory, sorted by name.
///
/// A missing directory is an I/O error; a directory without a single CSV is a
/// configuration error (the caller pointed the pipeline at the wrong place).
pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(Error::Configuration(format!(
            "no CSV files found in `{}`",
            dir.display()
        )));
    }
    Ok(paths)
}
