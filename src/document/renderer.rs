//! The per-day weather fragment.
//!
//! The fragment is produced in two places: by the `getWeather` script function
//! injected into the document (in the browser), and by [`render_day`] (here,
//! for previews and tests). Both are driven by the tables in this module, and
//! [`script_function`] generates the script from them, so the two stay in step.

use chrono::{Datelike, Local, NaiveDate};

use crate::domain::{DailyWeatherRecord, Reading, WeatherTable};

/// Name of the injected script function.
pub const RENDERER_NAME: &str = "getWeather";

pub const FEELS_WARMER_NOTE: &str = " (Humidity makes it feel even warmer!)";
pub const HUMIDITY_NOTE: &str = " with the tropical humidity";

/// Shown for days the forecast does not cover.
pub const FALLBACK_FRAGMENT: &str = "<div class=\"weather\"><div class=\"temp\">26°C</div><div class=\"wx-info\"><strong>Mostly Sunny</strong><br>Feels like 30°C+ with humidity<br>Water: 24°C · Trust us, it's warm! \u{2600}\u{fe0f}</div></div>";

const SUNSET_GLYPH: &str = "\u{1f305}";

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Sunny,
    Rain,
    Cloudy,
    Storm,
    PartlySunny,
}

/// Description keywords per icon, checked top to bottom; first hit wins.
pub const ICON_RULES: [(&[&str], Icon); 4] = [
    (&["rain", "shower"], Icon::Rain),
    (&["cloud", "overcast"], Icon::Cloudy),
    (&["thunder"], Icon::Storm),
    (&["partly"], Icon::PartlySunny),
];

impl Icon {
    pub fn glyph(self) -> &'static str {
        match self {
            Icon::Sunny => "\u{2600}\u{fe0f}",
            Icon::Rain => "\u{1f327}\u{fe0f}",
            Icon::Cloudy => "\u{26c5}",
            Icon::Storm => "\u{26c8}\u{fe0f}",
            Icon::PartlySunny => "\u{1f324}\u{fe0f}",
        }
    }

    /// Classify a free-text description (case-insensitive substring match).
    pub fn for_description(desc: &str) -> Icon {
        let lower = desc.to_lowercase();
        ICON_RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, icon)| *icon)
            .unwrap_or(Icon::Sunny)
    }
}

pub fn feels_note(record: &DailyWeatherRecord) -> &'static str {
    match (record.feels, record.high) {
        (Reading::Known(feels), Reading::Known(high)) if feels > high => FEELS_WARMER_NOTE,
        _ => HUMIDITY_NOTE,
    }
}

/// Month and day named by a display label like `"Feb 3"`.
///
/// Mirrors the script: the label is split on single spaces, the first part
/// must be a month abbreviation and the second a one- or two-digit day.
fn parse_label(label: &str) -> Option<(u32, u32)> {
    let mut parts = label.split(' ');
    let month = parts.next()?;
    let day = parts.next()?;

    let month = MONTHS.iter().position(|m| *m == month)? as u32 + 1;
    if day.is_empty() || day.len() > 2 || !day.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((month, day.parse().ok()?))
}

/// The table date a label refers to: the date in `year` if the table has it,
/// else the earliest table date with the same month and day. Labels carry no
/// year, so a forecast running from Dec 31 into Jan 1 still resolves.
pub fn lookup_key(label: &str, table: &WeatherTable, year: i32) -> Option<NaiveDate> {
    let (month, day) = parse_label(label)?;
    NaiveDate::from_ymd_opt(year, month, day)
        .filter(|date| table.contains_key(date))
        .or_else(|| {
            table
                .keys()
                .find(|date| date.month() == month && date.day() == day)
                .copied()
        })
}

/// Render the fragment for one record.
pub fn render_record(record: &DailyWeatherRecord) -> String {
    let icon = Icon::for_description(&record.desc);
    format!(
        "<div class=\"weather\"><div class=\"temp\">{high}°C</div><div class=\"wx-info\"><strong>{glyph} {desc}</strong><br>High {high}°C / Low {low}°C · Feels like <strong>{feels}°C</strong>{note}<br>Water: 24°C · Sunset {sunset} {SUNSET_GLYPH}</div></div>",
        high = record.high,
        low = record.low,
        feels = record.feels,
        glyph = icon.glyph(),
        desc = record.desc,
        note = feels_note(record),
        sunset = record.sunset,
    )
}

/// Render the fragment for a day label, falling back for unknown days.
pub fn render_day(label: &str, table: &WeatherTable, year: i32) -> String {
    lookup_key(label, table, year)
        .and_then(|date| table.get(&date))
        .map(render_record)
        .unwrap_or_else(|| FALLBACK_FRAGMENT.to_string())
}

/// The display label the document uses for a date (`"Feb 3"`).
pub fn day_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Year preferred when the table does not pin one down.
pub const DEFAULT_YEAR: i32 = 2026;

/// Year of the earliest forecast date.
pub fn table_year(table: &WeatherTable) -> Option<i32> {
    table.keys().next().map(|d| d.year())
}

/// Year the renderer should prefer: explicit, else the first forecast date's,
/// else the current local year.
pub fn resolve_year(explicit: Option<i32>, table: &WeatherTable) -> i32 {
    explicit
        .or_else(|| table_year(table))
        .unwrap_or_else(|| Local::now().year())
}

/// Generate the `getWeather(dayDate)` script function preferring `year`.
///
/// Lookup follows [`lookup_key`]: `year` first, then any key with the same
/// month and day.
pub fn script_function(year: i32) -> String {
    let month_map = MONTHS
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{m}:'{:02}'", i + 1))
        .collect::<Vec<_>>()
        .join(",");

    let mut lines = vec![
        format!("function {RENDERER_NAME}(dayDate) {{"),
        "  // dayDate like \"Feb 3\" -> WEATHER_DATA key like \"YYYY-02-03\"".to_string(),
        format!("  var monthMap = {{{month_map}}};"),
        "  var parts = String(dayDate).split(' ');".to_string(),
        "  var mm = monthMap.hasOwnProperty(parts[0]) ? monthMap[parts[0]] : null;".to_string(),
        "  var dd = parts[1] || '';".to_string(),
        format!("  var fallback = {};", js_str(FALLBACK_FRAGMENT)),
        "  if (!mm || !/^[0-9]{1,2}$/.test(dd)) return fallback;".to_string(),
        "  var suffix = '-' + mm + '-' + dd.padStart(2, '0');".to_string(),
        format!("  var w = WEATHER_DATA['{year}' + suffix];"),
        "  if (!w) {".to_string(),
        "    for (var k in WEATHER_DATA) {".to_string(),
        "      if (WEATHER_DATA.hasOwnProperty(k) && k.slice(-suffix.length) === suffix) { w = WEATHER_DATA[k]; break; }".to_string(),
        "    }".to_string(),
        "  }".to_string(),
        "  if (!w) return fallback;".to_string(),
        "  var d = String(w.desc).toLowerCase();".to_string(),
        format!("  var icon = {};", js_str(Icon::Sunny.glyph())),
    ];

    for (i, (keywords, icon)) in ICON_RULES.iter().enumerate() {
        let test = keywords
            .iter()
            .map(|k| format!("d.indexOf({}) > -1", js_str(k)))
            .collect::<Vec<_>>()
            .join(" || ");
        let keyword = if i == 0 { "if" } else { "else if" };
        lines.push(format!("  {keyword} ({test}) icon = {};", js_str(icon.glyph())));
    }

    lines.push(format!(
        "  var feelsNote = parseInt(w.feels, 10) > parseInt(w.high, 10) ? {} : {};",
        js_str(FEELS_WARMER_NOTE),
        js_str(HUMIDITY_NOTE)
    ));
    lines.push(format!(
        "  return '<div class=\"weather\"><div class=\"temp\">' + w.high + '°C</div><div class=\"wx-info\"><strong>' + icon + ' ' + w.desc + '</strong><br>High ' + w.high + '°C / Low ' + w.low + '°C · Feels like <strong>' + w.feels + '°C</strong>' + feelsNote + '<br>Water: 24°C · Sunset ' + w.sunset + ' {SUNSET_GLYPH}</div></div>';"
    ));
    lines.push("}".to_string());

    lines.join("\n")
}

/// Quote `s` as a single-quoted script string literal.
fn js_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
