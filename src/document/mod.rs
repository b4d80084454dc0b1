//! Idempotent patching of the target document.
//!
//! The document is treated as four named slots (see [`slots`]). Each step
//! checks its slot's presence marker before acting, so applying the patch to
//! its own output changes nothing, and pristine, partially patched and fully
//! patched inputs converge to the same result.
//!
//! Patching is a pure `&str -> String` transformation; reading and writing the
//! file is `crate::io`'s job.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{AnchorPolicy, WeatherTable};

pub mod renderer;
pub mod slots;

pub use slots::Slot;

use slots::{CALL_SITE_WIRED, DATA_TABLE_NAME, Pattern};

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("{slot} anchor `{anchor}` not found in document")]
    AnchorMissing { slot: Slot, anchor: &'static str },

    #[error("existing {slot} statement at byte {offset} has no terminating `;`")]
    Unterminated { slot: Slot, offset: usize },

    #[error("{slot} needs the {requires} in place first")]
    MissingDependency { slot: Slot, requires: Slot },

    #[error("failed to encode weather table: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What a single step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Nothing to do: already in its final form (or, for the legacy
    /// fragment, not there).
    Unchanged,
    Inserted,
    Replaced { duplicates_removed: usize },
    Removed { count: usize },
    /// Anchor not recognized; step left the document alone.
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, StepOutcome::Unchanged | StepOutcome::Skipped { .. })
    }
}

/// Per-slot outcome of one patch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub legacy: StepOutcome,
    pub data_table: StepOutcome,
    pub renderer: StepOutcome,
    pub call_site: StepOutcome,
}

impl PatchReport {
    pub fn steps(&self) -> [(Slot, &StepOutcome); 4] {
        [
            (Slot::Legacy, &self.legacy),
            (Slot::DataTable, &self.data_table),
            (Slot::Renderer, &self.renderer),
            (Slot::CallSite, &self.call_site),
        ]
    }

    pub fn changed(&self) -> bool {
        self.steps().iter().any(|(_, outcome)| outcome.changed())
    }

    pub fn skipped(&self) -> impl Iterator<Item = Slot> + '_ {
        self.steps()
            .into_iter()
            .filter(|(_, outcome)| matches!(outcome, StepOutcome::Skipped { .. }))
            .map(|(slot, _)| slot)
    }
}

#[derive(Debug, Clone)]
pub struct Patched {
    pub text: String,
    pub report: PatchReport,
}

/// Patch state of a document, derived from slot presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchState {
    Pristine,
    Partial,
    FullyPatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotPresence {
    pub legacy: bool,
    pub data_table: bool,
    pub renderer: bool,
    pub call_site: bool,
}

impl SlotPresence {
    pub fn state(&self) -> PatchState {
        match [self.data_table, self.renderer, self.call_site] {
            [false, false, false] => PatchState::Pristine,
            [true, true, true] => PatchState::FullyPatched,
            _ => PatchState::Partial,
        }
    }
}

/// Report which slots of `text` are filled.
pub fn inspect(text: &str) -> SlotPresence {
    SlotPresence {
        legacy: Slot::Legacy.is_present(text),
        data_table: Slot::DataTable.is_present(text),
        renderer: Slot::Renderer.is_present(text),
        call_site: Slot::CallSite.is_present(text),
    }
}

/// Patch with the default policy (skip unrecognized steps) and the renderer
/// year taken from the table, or [`renderer::DEFAULT_YEAR`] for an empty one.
///
/// On any error the input is returned unchanged.
pub fn patch(text: &str, table: &WeatherTable) -> String {
    let year = renderer::table_year(table).unwrap_or(renderer::DEFAULT_YEAR);
    match Patcher::new(year, AnchorPolicy::Skip).apply(text, table) {
        Ok(patched) => patched.text,
        Err(err) => {
            warn!(error = %err, "patch failed; document left unchanged");
            text.to_string()
        }
    }
}

/// The assignment statement holding the serialized table.
pub fn data_table_statement(table: &WeatherTable) -> Result<String, PatchError> {
    let json = serde_json::to_string(table)?;
    // Keep the literal inert inside an inline <script>.
    let json = json
        .replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    Ok(format!("var {DATA_TABLE_NAME} = {json};"))
}

#[derive(Debug, Clone, Copy)]
pub struct Patcher {
    year: i32,
    policy: AnchorPolicy,
}

impl Patcher {
    pub fn new(year: i32, policy: AnchorPolicy) -> Self {
        Self { year, policy }
    }

    /// Run all four steps in order. Under [`AnchorPolicy::Strict`] the first
    /// unrecognized anchor aborts with an error and no text is produced.
    ///
    /// The renderer is only injected once a data table exists, and the call
    /// site is only rewired once both exist; otherwise the step is unresolved.
    pub fn apply(&self, text: &str, table: &WeatherTable) -> Result<Patched, PatchError> {
        let mut doc = text.to_string();

        let legacy = remove_legacy(&mut doc);
        let data_table = self.write_data_table(&mut doc, table)?;
        let renderer = self.inject_renderer(&mut doc)?;
        let call_site = self.rewire_call_site(&mut doc)?;

        let report = PatchReport {
            legacy,
            data_table,
            renderer,
            call_site,
        };
        debug!(?report, "patch applied");
        Ok(Patched { text: doc, report })
    }

    fn write_data_table(&self, doc: &mut String, table: &WeatherTable) -> Result<StepOutcome, PatchError> {
        let statement = data_table_statement(table)?;
        let marker = Pattern::new(Slot::DataTable.marker());

        let Some(existing) = marker.find(doc, 0) else {
            return self.insert_before(doc, Slot::DataTable, &format!("{statement}\n\n"));
        };

        let Some(span) = slots::statement_span(doc, existing.start) else {
            return self.unresolved(PatchError::Unterminated {
                slot: Slot::DataTable,
                offset: existing.start,
            });
        };
        let identical = doc[span.clone()] == statement;
        doc.replace_range(span.clone(), &statement);

        // Any later assignment is a leftover; exactly one table stays.
        let mut duplicates_removed = 0;
        let mut from = span.start + statement.len();
        while let Some(dup) = marker.find(doc, from) {
            let Some(dup_span) = slots::statement_span(doc, dup.start) else {
                warn!(offset = dup.start, "unterminated duplicate data table left in place");
                break;
            };
            doc.replace_range(dup_span, "");
            duplicates_removed += 1;
            from = dup.start;
        }

        if identical && duplicates_removed == 0 {
            Ok(StepOutcome::Unchanged)
        } else {
            Ok(StepOutcome::Replaced { duplicates_removed })
        }
    }

    fn inject_renderer(&self, doc: &mut String) -> Result<StepOutcome, PatchError> {
        if Slot::Renderer.is_present(doc) {
            return Ok(StepOutcome::Unchanged);
        }
        if let Some(err) = missing_dependency(doc, Slot::Renderer, &[Slot::DataTable]) {
            return self.unresolved(err);
        }
        let block = format!("\n{}\n\n", renderer::script_function(self.year));
        self.insert_before(doc, Slot::Renderer, &block)
    }

    fn rewire_call_site(&self, doc: &mut String) -> Result<StepOutcome, PatchError> {
        if Slot::CallSite.is_present(doc) {
            return Ok(StepOutcome::Unchanged);
        }
        if let Some(err) = missing_dependency(doc, Slot::CallSite, &[Slot::DataTable, Slot::Renderer]) {
            return self.unresolved(err);
        }
        match find_anchor(doc, Slot::CallSite) {
            Some(range) => {
                doc.replace_range(range, CALL_SITE_WIRED);
                Ok(StepOutcome::Inserted)
            }
            None => self.unresolved(anchor_missing(Slot::CallSite)),
        }
    }

    fn insert_before(&self, doc: &mut String, slot: Slot, block: &str) -> Result<StepOutcome, PatchError> {
        match find_anchor(doc, slot) {
            Some(range) => {
                doc.insert_str(range.start, block);
                Ok(StepOutcome::Inserted)
            }
            None => self.unresolved(anchor_missing(slot)),
        }
    }

    fn unresolved(&self, err: PatchError) -> Result<StepOutcome, PatchError> {
        match self.policy {
            AnchorPolicy::Strict => Err(err),
            AnchorPolicy::Skip => {
                warn!(error = %err, "skipping patch step");
                Ok(StepOutcome::Skipped {
                    reason: err.to_string(),
                })
            }
        }
    }
}

fn remove_legacy(doc: &mut String) -> StepOutcome {
    let matches = Pattern::new(Slot::Legacy.marker()).find_all(doc);
    if matches.is_empty() {
        return StepOutcome::Unchanged;
    }
    for range in matches.iter().rev() {
        doc.replace_range(range.clone(), "");
    }
    StepOutcome::Removed { count: matches.len() }
}

fn find_anchor(doc: &str, slot: Slot) -> Option<std::ops::Range<usize>> {
    Pattern::new(slot.anchor()?).find(doc, 0)
}

fn missing_dependency(doc: &str, slot: Slot, requires: &[Slot]) -> Option<PatchError> {
    requires
        .iter()
        .find(|required| !required.is_present(doc))
        .map(|&requires| PatchError::MissingDependency { slot, requires })
}

fn anchor_missing(slot: Slot) -> PatchError {
    PatchError::AnchorMissing {
        slot,
        anchor: slot.anchor().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyWeatherRecord, FALLBACK_RECORD, Reading};
    use chrono::NaiveDate;
    use std::borrow::Cow;

    const PRISTINE: &str = r#"<html><body>
<div id="schedule">
    <div class="weather">
      <div class="temp">78°</div>
      <div class="wx-info"><strong>Mostly Sunny All Week</strong><br>Water: 75°F · Sunset ~5:50 PM<br>Pack the sunscreen, it's paradise time ☀️</div>
    </div>
</div>
<script>
var DAYS = [
  {date: 'Feb 3', name: 'Arrival'},
  {date: 'Feb 4', name: 'Beach'}
];

function renderDay(day) {
  var html = '<div class="section-head"><span class="icon">📍</span><h2>' + esc(day.date) + ' — ' + day.name + '</h2></div>';
  document.getElementById('day').innerHTML = html;
}

renderDay(DAYS[0]);
</script>
</body></html>
"#;

    fn table() -> WeatherTable {
        let mut t = WeatherTable::new();
        t.insert(
            NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            DailyWeatherRecord {
                high: Reading::Known(27),
                low: Reading::Known(22),
                feels: Reading::Known(30),
                desc: Cow::Borrowed("Sunny"),
                humidity: Reading::Known(60),
                sunset: Cow::Borrowed("5:52 PM"),
            },
        );
        t
    }

    fn other_table() -> WeatherTable {
        let mut t = WeatherTable::new();
        t.insert(NaiveDate::from_ymd_opt(2026, 2, 4).unwrap(), FALLBACK_RECORD);
        t
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn pristine_document_gets_all_slots_in_order() {
        let out = patch(PRISTINE, &table());

        let table_at = out.find("var WEATHER_DATA = {").unwrap();
        let days_at = out.find("var DAYS = [").unwrap();
        let fn_at = out.find("function getWeather(dayDate)").unwrap();
        let call_at = out.find("\nrenderDay(DAYS[0]);").unwrap();
        assert!(table_at < days_at);
        assert!(table_at < fn_at);
        assert!(fn_at < call_at);

        assert!(out.contains(
            r#"var WEATHER_DATA = {"2026-02-03":{"high":27,"low":22,"feels":30,"desc":"Sunny","humidity":60,"sunset":"5:52 PM"}};"#
        ));
        assert!(out.contains(
            r#"var html = getWeather(day.date) + '<div class="section-head"><span class="icon">📍</span>"#
        ));
        assert!(!out.contains("Mostly Sunny All Week"));
        assert_eq!(inspect(&out).state(), PatchState::FullyPatched);
    }

    #[test]
    fn patch_is_idempotent() {
        let once = patch(PRISTINE, &table());
        let twice = patch(&once, &table());
        assert_eq!(once, twice);

        let report = Patcher::new(2026, AnchorPolicy::Strict).apply(&once, &table()).unwrap().report;
        assert!(!report.changed());
    }

    #[test]
    fn partial_states_converge() {
        let full = patch(PRISTINE, &table());

        // Data table present, renderer and call site missing.
        let table_only = {
            let mut doc = PRISTINE.to_string();
            let at = doc.find("var DAYS = [").unwrap();
            doc.insert_str(at, &format!("{}\n\n", data_table_statement(&other_table()).unwrap()));
            doc
        };
        assert_eq!(inspect(&table_only).state(), PatchState::Partial);
        assert_eq!(patch(&table_only, &table()), full);

        // Renderer and call site present, data table missing.
        let statement = data_table_statement(&table()).unwrap();
        let no_table = full.replace(&format!("{statement}\n\n"), "");
        assert_eq!(inspect(&no_table).state(), PatchState::Partial);
        assert_eq!(patch(&no_table, &table()), full);

        // Fully patched with stale data.
        let stale = patch(PRISTINE, &other_table());
        assert_eq!(inspect(&stale).state(), PatchState::FullyPatched);
        assert_eq!(patch(&stale, &table()), full);
    }

    #[test]
    fn each_injected_element_appears_once() {
        let out = patch(&patch(&patch(PRISTINE, &other_table()), &table()), &table());
        assert_eq!(count(&out, "var WEATHER_DATA"), 1);
        assert_eq!(count(&out, "function getWeather"), 1);
        assert_eq!(count(&out, "getWeather(day.date)"), 1);
    }

    #[test]
    fn duplicate_tables_collapse_to_one() {
        let full = patch(PRISTINE, &table());
        let doubled = full.replace("</script>", "var WEATHER_DATA = {\"x\": 1};\n</script>");

        let patched = Patcher::new(2026, AnchorPolicy::Skip).apply(&doubled, &table()).unwrap();
        assert_eq!(count(&patched.text, "var WEATHER_DATA"), 1);
        assert_eq!(patched.report.data_table, StepOutcome::Replaced { duplicates_removed: 1 });
    }

    #[test]
    fn legacy_fragment_removed_only_when_present() {
        let patcher = Patcher::new(2026, AnchorPolicy::Skip);
        let report = patcher.apply(PRISTINE, &table()).unwrap().report;
        assert_eq!(report.legacy, StepOutcome::Removed { count: 1 });

        let without = PRISTINE.replace(slots::LEGACY_FRAGMENT, "");
        let mut doc = without.clone();
        assert_eq!(remove_legacy(&mut doc), StepOutcome::Unchanged);
        assert_eq!(doc, without);
    }

    #[test]
    fn unrecognized_document_is_left_alone_by_default() {
        let text = "<html><body>No script here.</body></html>";
        let patched = Patcher::new(2026, AnchorPolicy::Skip).apply(text, &table()).unwrap();
        assert_eq!(patched.text, text);
        assert_eq!(patched.report.skipped().count(), 3);
        assert!(!patched.report.changed());
    }

    #[test]
    fn strict_policy_reports_missing_anchor() {
        let text = PRISTINE.replace("renderDay(DAYS[0]);", "start();");
        let err = Patcher::new(2026, AnchorPolicy::Strict).apply(&text, &table()).unwrap_err();
        match err {
            PatchError::AnchorMissing { slot, anchor } => {
                assert_eq!(slot, Slot::Renderer);
                assert_eq!(anchor, "renderDay(DAYS[0]);");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn call_site_waits_for_renderer() {
        let text = PRISTINE.replace("renderDay(DAYS[0]);", "renderDay(DAYS[1]);");
        let patched = Patcher::new(2026, AnchorPolicy::Skip).apply(&text, &table()).unwrap();

        assert_eq!(patched.report.data_table, StepOutcome::Inserted);
        assert!(matches!(patched.report.renderer, StepOutcome::Skipped { .. }));
        assert_eq!(
            patched.report.call_site,
            StepOutcome::Skipped {
                reason: "call site needs the renderer in place first".to_string(),
            }
        );
        assert!(!patched.text.contains("getWeather(day.date)"));
        assert!(!patched.text.contains("function getWeather"));
    }

    #[test]
    fn renderer_waits_for_data_table() {
        let text = PRISTINE.replace("var DAYS = [", "const DAYS = [");
        let patched = Patcher::new(2026, AnchorPolicy::Skip).apply(&text, &table()).unwrap();

        assert!(matches!(patched.report.data_table, StepOutcome::Skipped { .. }));
        assert_eq!(
            patched.report.renderer,
            StepOutcome::Skipped {
                reason: "renderer needs the data table in place first".to_string(),
            }
        );
        assert!(matches!(patched.report.call_site, StepOutcome::Skipped { .. }));
        assert!(!patched.text.contains("function getWeather"));
        assert!(!patched.text.contains("getWeather(day.date)"));
        assert_eq!(inspect(&patched.text).state(), PatchState::Pristine);
    }

    #[test]
    fn existing_renderer_without_table_is_not_wired() {
        let text = PRISTINE
            .replace("var DAYS = [", "const DAYS = [")
            .replace("renderDay(DAYS[0]);", "function getWeather(d) { return ''; }\nrenderDay(DAYS[0]);");
        let patched = Patcher::new(2026, AnchorPolicy::Skip).apply(&text, &table()).unwrap();
        assert_eq!(patched.report.renderer, StepOutcome::Unchanged);
        assert_eq!(
            patched.report.call_site,
            StepOutcome::Skipped {
                reason: "call site needs the data table in place first".to_string(),
            }
        );
    }

    #[test]
    fn patch_with_empty_table_does_not_depend_on_clock() {
        let out = patch(PRISTINE, &WeatherTable::new());
        assert!(out.contains("var WEATHER_DATA = {};"));
        assert!(out.contains(&format!("WEATHER_DATA['{}' + suffix]", renderer::DEFAULT_YEAR)));
    }

    #[test]
    fn unterminated_table_is_never_rewritten() {
        let text = PRISTINE.replace("var DAYS = [", "var WEATHER_DATA = {\"2026-02-03\": {\nvar DAYS = [");
        let skip = Patcher::new(2026, AnchorPolicy::Skip).apply(&text, &table()).unwrap();
        assert!(matches!(skip.report.data_table, StepOutcome::Skipped { .. }));
        assert!(skip.text.contains("var WEATHER_DATA = {\"2026-02-03\": {\nvar DAYS = ["));

        let strict = Patcher::new(2026, AnchorPolicy::Strict).apply(&text, &table());
        assert!(matches!(strict, Err(PatchError::Unterminated { slot: Slot::DataTable, .. })));
    }

    #[test]
    fn existing_renderer_is_kept_as_is() {
        let custom = PRISTINE.replace(
            "renderDay(DAYS[0]);",
            "function getWeather(d) { return ''; }\nrenderDay(DAYS[0]);",
        );
        let out = patch(&custom, &table());
        assert!(out.contains("function getWeather(d) { return ''; }"));
        assert_eq!(count(&out, "function getWeather"), 1);
    }

    #[test]
    fn table_literal_cannot_close_script_tag() {
        let mut t = table();
        t.insert(
            NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            DailyWeatherRecord {
                desc: Cow::Borrowed("</script><b>"),
                ..FALLBACK_RECORD
            },
        );
        let statement = data_table_statement(&t).unwrap();
        assert!(!statement.contains("</script>"));
        assert!(statement.contains(r"<\/script>"));
    }

    #[test]
    fn inspect_classifies_states() {
        assert_eq!(inspect(PRISTINE).state(), PatchState::Pristine);
        assert!(inspect(PRISTINE).legacy);
        let full = patch(PRISTINE, &table());
        let presence = inspect(&full);
        assert!(!presence.legacy);
        assert_eq!(presence.state(), PatchState::FullyPatched);
    }
}
