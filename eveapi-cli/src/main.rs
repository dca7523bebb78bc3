// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! eveapi CLI - killmail aggregation and ESI lookups from the command line.
//!
//! # Examples
//!
//! ```bash
//! # All kills and losses of a corporation for May 2024
//! eveapi killmails --corporation 98000001 --year 2024 --month 5
//!
//! # Several entities, JSON output written to a file
//! eveapi killmails --corporation 98000001 --alliance 99000001 --output may.json
//!
//! # One killmail, zKillboard valuation merged with the ESI record
//! eveapi killmail 117650398
//!
//! # Resolve a station to its solar system
//! eveapi location resolve --station 60003760
//!
//! # Locations holding cyno items
//! eveapi assets --character 90000001
//!
//! # Raw cached ESI GET
//! eveapi get universe/systems/30000142/ --pretty
//! ```

mod app;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{assets, config, get, killmails, location};

// ============================================================================
// CLI Definition
// ============================================================================

/// eveapi CLI - resilient ESI and zKillboard client.
#[derive(Parser)]
#[command(name = "eveapi")]
#[command(about = "Resilient ESI and zKillboard client")]
#[command(long_about = r#"
eveapi fetches killmails from zKillboard, enriches them with the ESI record
and caches every upstream response.

Requests retry transient failures with exponential backoff, honour
zKillboard's Retry-After, and send a fixed User-Agent (see `config show`).

Examples:
  eveapi killmails --corporation 98000001            # Current month
  eveapi killmails --alliance 99000001 --month 3     # March of this year
  eveapi killmail 117650398                          # Single killmail
  eveapi location clones --character 90000001        # Needs a token
  eveapi assets --corporation 98000001               # Cyno stashes
  eveapi get status/                                 # Any ESI GET
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// ESI access token for authenticated endpoints.
    #[arg(long, env = "EVEAPI_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and merge every killmail of some entities for one month.
    #[command(visible_alias = "k")]
    Killmails(killmails::KillmailsArgs),

    /// Fetch one killmail by id.
    Killmail(killmails::KillmailArgs),

    /// Resolve stations, structures and character locations.
    #[command(visible_alias = "l")]
    Location(location::LocationArgs),

    /// List locations holding cyno items (needs a token).
    Assets(assets::AssetsArgs),

    /// Run a cached GET against ESI and print the raw body.
    Get(get::GetArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Finished, but some feeds or killmails were skipped.
    Incomplete = 2,
    /// Interrupted by Ctrl-C.
    Cancelled = 130,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("eveapi=debug,info")
    } else {
        EnvFilter::new("eveapi=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Killmails(args) => killmails::run(args, &cli).await,
        Commands::Killmail(args) => killmails::run_single(args, &cli).await,
        Commands::Location(args) => location::run(args, &cli).await,
        Commands::Assets(args) => assets::run(args, &cli).await,
        Commands::Get(args) => get::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
