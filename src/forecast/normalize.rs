//! Raw forecast -> `WeatherTable`.
//!
//! Normalization never fails: a missing optional field is replaced by the
//! matching field of `FALLBACK_RECORD`. Only the date is mandatory, and a day
//! without a usable date is skipped.

use std::borrow::Cow;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::data::{RawDay, RawForecast, RawHour};
use crate::domain::{DailyWeatherRecord, FALLBACK_RECORD, Reading, WeatherTable};

/// Time-of-day codes that count as "midday", most preferred first.
pub const MIDDAY_CODES: [&str; 2] = ["1200", "1500"];

/// Normalize every usable day of the payload.
///
/// Later entries for the same date overwrite earlier ones.
pub fn normalize(raw: &RawForecast) -> WeatherTable {
    let mut table = WeatherTable::new();
    for (idx, day) in raw.weather.iter().enumerate() {
        let Some(date) = parse_day_date(day) else {
            warn!(entry = idx, date = ?day.date, "skipping forecast day without a usable date");
            continue;
        };
        if table.insert(date, normalize_day(day)).is_some() {
            debug!(%date, "duplicate forecast date; later entry wins");
        }
    }
    table
}

/// Build the record for one day. The date is not inspected here.
pub fn normalize_day(day: &RawDay) -> DailyWeatherRecord {
    let midday = select_midday(&day.hourly);

    let feels = midday
        .map(|h| h.feels_like_c.or(h.heat_index_c))
        .unwrap_or(FALLBACK_RECORD.feels);
    let humidity = midday.map(|h| h.humidity).unwrap_or(FALLBACK_RECORD.humidity);
    let desc = midday
        .and_then(|h| h.weather_desc.first())
        .and_then(|d| non_blank(d.value.as_deref()))
        .map(|s| Cow::Owned(s.to_string()))
        .unwrap_or(FALLBACK_RECORD.desc);
    let sunset = day
        .astronomy
        .first()
        .and_then(|a| non_blank(a.sunset.as_deref()))
        .map(|s| Cow::Owned(s.to_string()))
        .unwrap_or(FALLBACK_RECORD.sunset);

    DailyWeatherRecord {
        high: day.max_temp_c,
        low: day.min_temp_c,
        feels,
        desc,
        humidity,
        sunset,
    }
}

/// Pick the representative midday sample.
///
/// Walks `MIDDAY_CODES` in order and returns the first hour carrying that
/// code, so the result does not depend on how the hours are ordered.
pub fn select_midday(hours: &[RawHour]) -> Option<&RawHour> {
    MIDDAY_CODES.iter().find_map(|code| {
        hours
            .iter()
            .find(|h| h.time.as_deref().map(str::trim) == Some(*code))
    })
}

fn parse_day_date(day: &RawDay) -> Option<NaiveDate> {
    let raw = day.date.as_deref()?.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
