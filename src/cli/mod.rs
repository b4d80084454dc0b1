//! Command-line parsing for the weather patcher.
//!
//! Argument parsing and command dispatch stay separate from fetching and
//! patching. Every option has a default (most can also come from the
//! environment or `.env`), so a bare `wxpatch` runs a full update.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{
    AnchorPolicy, DEFAULT_BASE_URL, DEFAULT_LOCATION, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "wxpatch",
    version,
    about = "Inject a per-day weather forecast into a static itinerary page"
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the forecast and patch the document (default).
    Update(UpdateArgs),
    /// Fetch the forecast and print each day's rendered fragment.
    ///
    /// The document is not read or written.
    Preview(PreviewArgs),
    /// Show which weather elements the document already contains.
    Status(StatusArgs),
}

/// Where the forecast comes from.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Location passed to wttr.in (city, "City,Country", airport code, ...).
    #[arg(long, env = "WXPATCH_LOCATION", default_value = DEFAULT_LOCATION)]
    pub location: String,

    /// Base URL of the wttr.in service.
    #[arg(long, env = "WXPATCH_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds.
    #[arg(long, env = "WXPATCH_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// User-Agent header sent with the request.
    #[arg(long, env = "WXPATCH_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

/// Options for `update`.
#[derive(Debug, Args, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Document to patch.
    #[arg(short, long, env = "WXPATCH_DOCUMENT", default_value = "index.html")]
    pub document: PathBuf,

    /// What to do when an anchor statement is not found.
    #[arg(long, env = "WXPATCH_ANCHORS", value_enum, default_value_t = AnchorPolicy::Skip)]
    pub anchors: AnchorPolicy,

    /// Year the page's day labels ("Feb 3") belong to.
    ///
    /// Defaults to the year of the first forecast day.
    #[arg(long, env = "WXPATCH_YEAR")]
    pub year: Option<i32>,

    /// Patch in memory and report, but do not write the document.
    #[arg(long)]
    pub dry_run: bool,
}

/// Options for `preview`.
#[derive(Debug, Args, Clone)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Year the day labels belong to (defaults to the first forecast day's).
    #[arg(long, env = "WXPATCH_YEAR")]
    pub year: Option<i32>,
}

/// Options for `status`.
#[derive(Debug, Args, Clone)]
pub struct StatusArgs {
    /// Document to inspect.
    #[arg(short, long, env = "WXPATCH_DOCUMENT", default_value = "index.html")]
    pub document: PathBuf,
}
