//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the `Reading` value (number or unknown sentinel)
//! - normalized weather records (`DailyWeatherRecord`, `WeatherTable`)
//! - run configuration (`UpdateConfig`, `SourceConfig`, `AnchorPolicy`)

pub mod types;

pub use types::*;
