//! Input/output helpers.
//!
//! - whole-document read and atomic write-back (`document`)

pub mod document;

pub use document::*;
