//! Input/output helpers.
//!
//! - lazy CSV ingest + row-level validation (`ingest`)
//! - diagnostics/report exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
