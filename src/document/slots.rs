//! Named slots of the target document and the text matching behind them.
//!
//! Every slot is located through a [`Pattern`]: literal text where any run of
//! whitespace in the pattern matches any run of whitespace in the document
//! (including none, unless it separates two identifier characters). Patterns
//! that start or end with an identifier character only match on identifier
//! boundaries, so `function getWeather` does not match `function getWeatherIcon`.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// The hard-coded weather block the page shipped with before per-day data.
pub const LEGACY_FRAGMENT: &str = "<div class=\"weather\">
      <div class=\"temp\">78°</div>
      <div class=\"wx-info\"><strong>Mostly Sunny All Week</strong><br>Water: 75°F · Sunset ~5:50 PM<br>Pack the sunscreen, it's paradise time \u{2600}\u{fe0f}</div>
    </div>";

pub const DATA_TABLE_NAME: &str = "WEATHER_DATA";
pub const DATA_TABLE_MARKER: &str = "var WEATHER_DATA";
pub const DATA_TABLE_ANCHOR: &str = "var DAYS = [";

pub const RENDERER_MARKER: &str = "function getWeather";
pub const RENDERER_ANCHOR: &str = "renderDay(DAYS[0]);";

pub const CALL_SITE_MARKER: &str = "getWeather(day.date)";
pub const CALL_SITE_ANCHOR: &str = "var html = '<div class=\"section-head\">";
pub const CALL_SITE_WIRED: &str = "var html = getWeather(day.date) + '<div class=\"section-head\">";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Legacy,
    DataTable,
    Renderer,
    CallSite,
}

impl Slot {
    pub fn name(self) -> &'static str {
        match self {
            Slot::Legacy => "legacy fragment",
            Slot::DataTable => "data table",
            Slot::Renderer => "renderer",
            Slot::CallSite => "call site",
        }
    }

    /// Text whose presence means the slot is filled.
    pub fn marker(self) -> &'static str {
        match self {
            Slot::Legacy => LEGACY_FRAGMENT,
            Slot::DataTable => DATA_TABLE_MARKER,
            Slot::Renderer => RENDERER_MARKER,
            Slot::CallSite => CALL_SITE_MARKER,
        }
    }

    /// Text the slot is inserted at (or rewritten from).
    pub fn anchor(self) -> Option<&'static str> {
        match self {
            Slot::Legacy => None,
            Slot::DataTable => Some(DATA_TABLE_ANCHOR),
            Slot::Renderer => Some(RENDERER_ANCHOR),
            Slot::CallSite => Some(CALL_SITE_ANCHOR),
        }
    }

    pub fn is_present(self, text: &str) -> bool {
        Pattern::new(self.marker()).find(text, 0).is_some()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'a> {
    Lit(&'a str),
    /// Whitespace run; `required` when it separates identifier characters.
    Gap { required: bool },
}

/// Whitespace-tolerant literal pattern.
#[derive(Debug, Clone)]
pub struct Pattern<'a> {
    pieces: Vec<Piece<'a>>,
    word_start: bool,
    word_end: bool,
}

impl<'a> Pattern<'a> {
    pub fn new(pattern: &'a str) -> Self {
        let pattern = pattern.trim();
        let mut pieces = Vec::new();
        let mut rest = pattern;
        while !rest.is_empty() {
            let lit_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let (lit, tail) = rest.split_at(lit_len);
            pieces.push(Piece::Lit(lit));
            let gap_len = tail.len() - tail.trim_start().len();
            if gap_len > 0 {
                let after = tail[gap_len..].chars().next();
                let required = lit.chars().next_back().is_some_and(is_ident)
                    && after.is_some_and(is_ident);
                pieces.push(Piece::Gap { required });
            }
            rest = &tail[gap_len..];
        }

        Self {
            pieces,
            word_start: pattern.chars().next().is_some_and(is_ident),
            word_end: pattern.chars().next_back().is_some_and(is_ident),
        }
    }

    /// First match starting at or after byte offset `from`.
    pub fn find(&self, text: &str, from: usize) -> Option<Range<usize>> {
        let Piece::Lit(first) = self.pieces.first()? else {
            return None;
        };
        let mut search = from;
        while search <= text.len() {
            let start = search + text.get(search..)?.find(first)?;
            if let Some(end) = self.match_at(text, start) {
                return Some(start..end);
            }
            search = start + first.len().max(1);
            while !text.is_char_boundary(search) {
                search += 1;
            }
        }
        None
    }

    /// All non-overlapping matches.
    pub fn find_all(&self, text: &str) -> Vec<Range<usize>> {
        let mut out = Vec::new();
        let mut from = 0;
        while let Some(range) = self.find(text, from) {
            from = range.end;
            out.push(range);
        }
        out
    }

    fn match_at(&self, text: &str, start: usize) -> Option<usize> {
        if self.word_start && text[..start].chars().next_back().is_some_and(is_ident) {
            return None;
        }

        let mut pos = start;
        for piece in &self.pieces {
            match piece {
                Piece::Lit(lit) => {
                    if !text[pos..].starts_with(lit) {
                        return None;
                    }
                    pos += lit.len();
                }
                Piece::Gap { required } => {
                    let rest = &text[pos..];
                    let skipped = rest.len() - rest.trim_start().len();
                    if *required && skipped == 0 {
                        return None;
                    }
                    pos += skipped;
                }
            }
        }

        if self.word_end && text[pos..].chars().next().is_some_and(is_ident) {
            return None;
        }
        Some(pos)
    }
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Byte range of the statement that starts at `start`, through its `;`.
///
/// The terminator is the first `;` that is not inside brackets, braces,
/// parentheses or a string literal. Returns `None` when there is no such
/// terminator, or when a closing bracket leaves the statement's own nesting
/// level first (the statement runs into surrounding code).
pub fn statement_span(text: &str, start: usize) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    let mut depth: usize = 0;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (offset, &b) in bytes.get(start..)?.iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }

        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'{' | b'[' | b'(' => depth += 1,
            b'}' | b']' | b')' => depth = depth.checked_sub(1)?,
            b';' if depth == 0 => return Some(start..start + offset + 1),
            _ => {}
        }
    }
    None
}
