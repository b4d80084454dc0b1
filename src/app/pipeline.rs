//! The update workflow shared by the CLI commands:
//! fetch -> normalize -> read document -> patch -> write document
//!
//! The document is touched only after the forecast has been fetched and
//! normalized, so a failed fetch never changes it.

use tracing::info;

use crate::data::{RawForecast, WttrClient};
use crate::document::{PatchReport, Patcher, renderer};
use crate::domain::{SourceConfig, UpdateConfig, WeatherTable};
use crate::error::AppError;
use crate::forecast::normalize;
use crate::io::{read_document, write_document};

/// All outputs of a single `update` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub table: WeatherTable,
    pub report: PatchReport,
    /// Year the injected renderer was built for.
    pub year: i32,
    /// Whether the document file was rewritten.
    pub written: bool,
}

/// Fetch and normalize the forecast.
pub fn fetch_table(source: &SourceConfig) -> Result<WeatherTable, AppError> {
    let client = WttrClient::new(source)?;
    let raw = client.fetch()?;
    Ok(normalize(&raw))
}

/// Execute the full update: network fetch, then the document work.
pub fn run_update(config: &UpdateConfig) -> Result<RunOutput, AppError> {
    let client = WttrClient::new(&config.source)?;
    let raw = client.fetch()?;

    run_update_with_payload(config, &raw)
}

/// Execute the update with an already fetched payload.
pub fn run_update_with_payload(config: &UpdateConfig, raw: &RawForecast) -> Result<RunOutput, AppError> {
    let table = normalize(raw);
    if table.is_empty() {
        return Err(AppError::fetch(
            "Forecast contained no usable days; document left unchanged.",
        ));
    }
    info!(days = table.len(), "forecast normalized");

    let year = renderer::resolve_year(config.year, &table);
    let original = read_document(&config.document)?;
    let patched = Patcher::new(year, config.anchors).apply(&original, &table)?;

    let written = if config.dry_run {
        info!("dry run; document not written");
        false
    } else if patched.text == original {
        info!("document already up to date");
        false
    } else {
        write_document(&config.document, &patched.text)?;
        info!(path = %config.document.display(), "document updated");
        true
    };

    Ok(RunOutput {
        table,
        report: patched.report,
        year,
        written,
    })
}
