//! Upstream forecast data.

pub mod wttr;

pub use wttr::{RawAstronomy, RawDay, RawForecast, RawHour, RawText, WttrClient};
