//! Shared domain types.
//!
//! These are the values that flow between the forecast source, the normalizer,
//! the document patcher and the reports. They stay small and serializable: the
//! weather table is embedded verbatim (as JSON) into the target document.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Textual form of [`Reading::Unknown`] inside the document and in reports.
pub const UNKNOWN_SENTINEL: &str = "?";

pub const DEFAULT_DESC: &str = "Sunny";
pub const DEFAULT_SUNSET: &str = "5:50 PM";

pub const DEFAULT_LOCATION: &str = "Nassau,Bahamas";
pub const DEFAULT_BASE_URL: &str = "https://wttr.in";
pub const DEFAULT_USER_AGENT: &str = "curl/7.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A numeric weather value (°C or %) or the explicit "unknown" sentinel.
///
/// Upstream sends numbers as JSON strings (`"27"`), sometimes as numbers. Both
/// decode to `Known`; anything that is not a number decodes to `Unknown`.
/// `Known` serializes as a JSON number, `Unknown` as `"?"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reading {
    Known(i64),
    #[default]
    Unknown,
}

impl Reading {
    /// Parse a loosely formatted numeric string (`"27"`, `" 27 "`, `"26.6"`).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return Reading::Known(v);
        }
        match trimmed.parse::<f64>() {
            Ok(v) => Self::from_f64(v),
            Err(_) => Reading::Unknown,
        }
    }

    fn from_f64(v: f64) -> Self {
        if v.is_finite() && v.abs() < i64::MAX as f64 {
            Reading::Known(v.round() as i64)
        } else {
            Reading::Unknown
        }
    }

    /// `self` if known, else `other`.
    pub fn or(self, other: Reading) -> Reading {
        match self {
            Reading::Known(_) => self,
            Reading::Unknown => other,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Known(v) => write!(f, "{v}"),
            Reading::Unknown => f.write_str(UNKNOWN_SENTINEL),
        }
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reading::Known(v) => serializer.serialize_i64(*v),
            Reading::Unknown => serializer.serialize_str(UNKNOWN_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReadingVisitor;

        impl Visitor<'_> for ReadingVisitor {
            type Value = Reading;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number, a numeric string, or null")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Reading, E> {
                Ok(Reading::Known(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Reading, E> {
                Ok(i64::try_from(v).map(Reading::Known).unwrap_or(Reading::Unknown))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Reading, E> {
                Ok(Reading::from_f64(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Reading, E> {
                Ok(Reading::parse(v))
            }

            fn visit_bool<E: de::Error>(self, _: bool) -> Result<Reading, E> {
                Ok(Reading::Unknown)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Reading, E> {
                Ok(Reading::Unknown)
            }

            fn visit_none<E: de::Error>(self) -> Result<Reading, E> {
                Ok(Reading::Unknown)
            }
        }

        deserializer.deserialize_any(ReadingVisitor)
    }
}

/// Normalized per-day weather summary.
///
/// The date is not a field: it is the key of the [`WeatherTable`]. Field order
/// here is the key order of the JSON object embedded in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWeatherRecord {
    pub high: Reading,
    pub low: Reading,
    pub feels: Reading,
    pub desc: Cow<'static, str>,
    pub humidity: Reading,
    pub sunset: Cow<'static, str>,
}

/// Every default the normalizer may substitute, in one place.
pub const FALLBACK_RECORD: DailyWeatherRecord = DailyWeatherRecord {
    high: Reading::Unknown,
    low: Reading::Unknown,
    feels: Reading::Unknown,
    desc: Cow::Borrowed(DEFAULT_DESC),
    humidity: Reading::Unknown,
    sunset: Cow::Borrowed(DEFAULT_SUNSET),
};

impl Default for DailyWeatherRecord {
    fn default() -> Self {
        FALLBACK_RECORD
    }
}

/// Normalized records keyed by calendar date (serialized as `YYYY-MM-DD`).
pub type WeatherTable = BTreeMap<NaiveDate, DailyWeatherRecord>;

/// What to do when a document anchor cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPolicy {
    /// Skip the affected step, log a warning, keep going.
    #[default]
    Skip,
    /// Abort the patch; the document is left untouched.
    Strict,
}

/// Where and how to fetch the forecast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub base_url: String,
    pub location: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// A full `update` run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus env and defaults).
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub document: PathBuf,
    pub source: SourceConfig,
    pub anchors: AnchorPolicy,
    /// Year used by the injected renderer to turn `"Feb 3"` into a date key.
    ///
    /// `None` means: derive it from the forecast.
    pub year: Option<i32>,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_decodes_strings_numbers_and_junk() {
        let parsed: Vec<Reading> = serde_json::from_str(r#"["27", 22, 26.6, "", "n/a", null]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Reading::Known(27),
                Reading::Known(22),
                Reading::Known(27),
                Reading::Unknown,
                Reading::Unknown,
                Reading::Unknown,
            ]
        );
    }

    #[test]
    fn reading_serializes_unknown_as_sentinel() {
        let json = serde_json::to_string(&[Reading::Known(30), Reading::Unknown]).unwrap();
        assert_eq!(json, r#"[30,"?"]"#);
    }

    #[test]
    fn fallback_record_has_documented_defaults() {
        let record = DailyWeatherRecord::default();
        assert_eq!(record.desc, "Sunny");
        assert_eq!(record.sunset, "5:50 PM");
        assert_eq!(record.feels, Reading::Unknown);
        assert_eq!(record.humidity, Reading::Unknown);
    }

    #[test]
    fn table_serializes_with_date_string_keys() {
        let mut table = WeatherTable::new();
        table.insert(
            NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            DailyWeatherRecord {
                high: Reading::Known(27),
                low: Reading::Known(22),
                ..FALLBACK_RECORD
            },
        );
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(
            json,
            r#"{"2026-02-03":{"high":27,"low":22,"feels":"?","desc":"Sunny","humidity":"?","sunset":"5:50 PM"}}"#
        );
    }
}
