//! Canonical schema declaration and header reconciliation.
//!
//! Responsibilities:
//!
//! - declare the expected column set, types, and label vocabulary
//! - normalize drifted raw headers onto canonical names
//! - hold the one registered schema as explicit, passed-in state

pub mod registry;

pub use registry::*;
