//! Forecast normalization.

pub mod normalize;

pub use normalize::{MIDDAY_CODES, normalize, normalize_day, select_midday};
