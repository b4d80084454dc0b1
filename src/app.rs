//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - runs the fetch/normalize/patch pipeline
//! - prints reports

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, PreviewArgs, SourceArgs, StatusArgs, UpdateArgs};
use crate::domain::{SourceConfig, UpdateConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `wxpatch` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `wxpatch` and `wxpatch --document x.html` behave like `wxpatch update ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(cli.verbose);

    match cli.command {
        Command::Update(args) => handle_update(args),
        Command::Preview(args) => handle_preview(args),
        Command::Status(args) => handle_status(args),
    }
}

fn handle_update(args: UpdateArgs) -> Result<(), AppError> {
    let config = update_config_from_args(&args);
    let run = pipeline::run_update(&config)?;

    eprint!(
        "{}",
        crate::report::format_patch_summary(&config.document, &run.report, config.dry_run)
    );
    println!("{}", crate::report::format_table_json(&run.table)?);
    Ok(())
}

fn handle_preview(args: PreviewArgs) -> Result<(), AppError> {
    let table = pipeline::fetch_table(&source_config_from_args(&args.source))?;
    let year = crate::document::renderer::resolve_year(args.year, &table);

    print!("{}", crate::report::format_preview(&table, year));
    Ok(())
}

fn handle_status(args: StatusArgs) -> Result<(), AppError> {
    let text = crate::io::read_document(&args.document)?;
    let presence = crate::document::inspect(&text);

    print!("{}", crate::report::format_status(&args.document, &presence));
    Ok(())
}

pub fn source_config_from_args(args: &SourceArgs) -> SourceConfig {
    SourceConfig {
        base_url: args.base_url.clone(),
        location: args.location.clone(),
        user_agent: args.user_agent.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
    }
}

pub fn update_config_from_args(args: &UpdateArgs) -> UpdateConfig {
    UpdateConfig {
        document: args.document.clone(),
        source: source_config_from_args(&args.source),
        anchors: args.anchors,
        year: args.year,
        dry_run: args.dry_run,
    }
}

/// Logs go to stderr; stdout carries only the command's output.
fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "wxpatch=info",
        1 => "wxpatch=debug",
        _ => "wxpatch=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A subscriber may already be installed (e.g. when embedded); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Rewrite argv so `wxpatch` defaults to `wxpatch update`.
///
/// Rules:
/// - `wxpatch`                       -> `wxpatch update`
/// - `wxpatch --dry-run ...`         -> `wxpatch update --dry-run ...`
/// - `wxpatch --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("update".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "update" | "preview" | "status");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "update flags".
    if arg1.starts_with('-') {
        argv.insert(1, "update".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
