//! Reporting: the confirmation artifact and human-readable summaries.

pub mod format;

pub use format::*;
