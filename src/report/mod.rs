//! Reporting: formatted summaries of an assembled dataset.
//!
//! Formatting stays in one place so:
//! - ingest/assembly code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

pub mod format;

pub use format::*;
