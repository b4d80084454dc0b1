//! Formatted terminal output.
//!
//! All output strings are built here so the pipeline stays free of
//! presentation details.

use std::path::Path;

use crate::document::renderer::{day_label, render_day};
use crate::document::{PatchReport, PatchState, Slot, SlotPresence, StepOutcome};
use crate::domain::WeatherTable;
use crate::error::AppError;

/// The normalized mapping as pretty JSON (the run's confirmation artifact).
pub fn format_table_json(table: &WeatherTable) -> Result<String, AppError> {
    serde_json::to_string_pretty(table)
        .map_err(|e| AppError::io(format!("Failed to encode weather table: {e}")))
}

/// One line per slot describing what the patch did.
pub fn format_patch_summary(path: &Path, report: &PatchReport, dry_run: bool) -> String {
    let mut out = String::new();
    let verb = match (dry_run, report.changed()) {
        (true, _) => "would update",
        (false, true) => "updated",
        (false, false) => "already up to date",
    };
    out.push_str(&format!("{}: {verb}\n", path.display()));
    for (slot, outcome) in report.steps() {
        out.push_str(&format!("  {:<16} {}\n", slot.name(), describe(outcome)));
    }
    out
}

fn describe(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Unchanged => "unchanged".to_string(),
        StepOutcome::Inserted => "inserted".to_string(),
        StepOutcome::Replaced { duplicates_removed: 0 } => "replaced".to_string(),
        StepOutcome::Replaced { duplicates_removed } => {
            format!("replaced ({duplicates_removed} duplicate(s) removed)")
        }
        StepOutcome::Removed { count } => format!("removed ({count})"),
        StepOutcome::Skipped { reason } => format!("skipped: {reason}"),
    }
}

/// Slot-by-slot state of a document.
pub fn format_status(path: &Path, presence: &SlotPresence) -> String {
    let state = match presence.state() {
        PatchState::Pristine => "pristine",
        PatchState::Partial => "partially patched",
        PatchState::FullyPatched => "fully patched",
    };
    let mut out = format!("{}: {state}\n", path.display());
    for (slot, present) in [
        (Slot::Legacy, presence.legacy),
        (Slot::DataTable, presence.data_table),
        (Slot::Renderer, presence.renderer),
        (Slot::CallSite, presence.call_site),
    ] {
        let mark = if present { "present" } else { "absent" };
        out.push_str(&format!("  {:<16} {mark}\n", slot.name()));
    }
    out
}

/// The fragment each forecast day would render to in the document.
pub fn format_preview(table: &WeatherTable, year: i32) -> String {
    let mut out = String::new();
    for date in table.keys() {
        let label = day_label(*date);
        out.push_str(&format!("{label} ({date})\n"));
        out.push_str(&format!("  {}\n", render_day(&label, table, year)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::domain::FALLBACK_RECORD;

    #[test]
    fn patch_summary_lists_every_slot() {
        let report = PatchReport {
            legacy: StepOutcome::Removed { count: 1 },
            data_table: StepOutcome::Replaced { duplicates_removed: 2 },
            renderer: StepOutcome::Unchanged,
            call_site: StepOutcome::Skipped {
                reason: "call site anchor missing".to_string(),
            },
        };
        let text = format_patch_summary(Path::new("index.html"), &report, false);
        assert!(text.starts_with("index.html: updated\n"));
        assert!(text.contains("legacy fragment  removed (1)"));
        assert!(text.contains("data table       replaced (2 duplicate(s) removed)"));
        assert!(text.contains("renderer         unchanged"));
        assert!(text.contains("call site        skipped: call site anchor missing"));
    }

    #[test]
    fn dry_run_summary_says_would_update() {
        let report = PatchReport {
            legacy: StepOutcome::Unchanged,
            data_table: StepOutcome::Unchanged,
            renderer: StepOutcome::Unchanged,
            call_site: StepOutcome::Unchanged,
        };
        let text = format_patch_summary(Path::new("a.html"), &report, true);
        assert!(text.starts_with("a.html: would update"));
    }

    #[test]
    fn status_reports_state_and_slots() {
        let presence = SlotPresence {
            legacy: false,
            data_table: true,
            renderer: false,
            call_site: true,
        };
        let text = format_status(Path::new("index.html"), &presence);
        assert!(text.starts_with("index.html: partially patched\n"));
        assert!(text.contains("renderer         absent"));
        assert!(text.contains("data table       present"));
    }

    #[test]
    fn preview_renders_each_day() {
        let mut table = WeatherTable::new();
        table.insert(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(), FALLBACK_RECORD);
        let text = format_preview(&table, 2026);
        assert!(text.starts_with("Feb 3 (2026-02-03)\n  <div class=\"weather\">"));
    }

    #[test]
    fn preview_spans_the_new_year() {
        let mut table = WeatherTable::new();
        table.insert(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(), FALLBACK_RECORD);
        table.insert(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(), FALLBACK_RECORD);

        let text = format_preview(&table, 2026);
        assert!(text.contains("Jan 1 (2027-01-01)\n"));
        assert!(!text.contains(crate::document::renderer::FALLBACK_FRAGMENT));
        assert_eq!(text.matches("<div class=\"temp\">?°C</div>").count(), 2);
    }

    #[test]
    fn table_json_is_pretty() {
        let mut table = WeatherTable::new();
        table.insert(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(), FALLBACK_RECORD);
        let json = format_table_json(&table).unwrap();
        assert!(json.contains("\"2026-02-03\": {\n    \"high\": \"?\","));
    }
}
