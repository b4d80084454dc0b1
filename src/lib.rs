//! `wxpatch` library crate.
//!
//! The binary (`wxpatch`) is a thin wrapper around this library so that:
//!
//! - normalization and document patching are testable without network or files
//! - the whole update pipeline can be driven with a pre-fetched payload

pub mod app;
pub mod cli;
pub mod data;
pub mod document;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod report;
