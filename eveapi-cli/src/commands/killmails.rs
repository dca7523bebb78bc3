//! Killmail commands - monthly aggregation and single lookups.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::{Datelike, Utc};
use clap::Args;
use eveapi_core::{EntityGroups, MergedRecord, merge};
use eveapi_fetch::FetchError;
use eveapi_sources::{AggregationReport, aggregate};
use eveapi_store::{load_records, save_records};
use tracing::info;

use crate::app::{App, interruptible_context};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the killmails command.
#[derive(Args)]
pub struct KillmailsArgs {
    /// Corporation ids (comma-separated or repeated).
    #[arg(long, value_delimiter = ',')]
    pub corporation: Vec<i64>,

    /// Alliance ids (comma-separated or repeated).
    #[arg(long, value_delimiter = ',')]
    pub alliance: Vec<i64>,

    /// Character ids (comma-separated or repeated).
    #[arg(long, value_delimiter = ',')]
    pub character: Vec<i64>,

    /// Year (defaults to the current UTC year).
    #[arg(long)]
    pub year: Option<i32>,

    /// Month 1-12 (defaults to the current UTC month).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Override the configured page ceiling.
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Write the merged records to a JSON file.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Keep the records already in the output file and add the new ones.
    #[arg(long, requires = "output")]
    pub append: bool,

    /// Print the full run report instead of the records.
    #[arg(long)]
    pub report: bool,
}

impl KillmailsArgs {
    fn groups(&self) -> EntityGroups {
        EntityGroups::new()
            .with_corporations(self.corporation.iter().copied())
            .with_alliances(self.alliance.iter().copied())
            .with_characters(self.character.iter().copied())
    }

    fn window(&self) -> (i32, u32) {
        let now = Utc::now();
        (
            self.year.unwrap_or_else(|| now.year()),
            self.month.unwrap_or_else(|| now.month()),
        )
    }
}

/// Arguments for the single killmail command.
#[derive(Args)]
pub struct KillmailArgs {
    /// Killmail id.
    pub id: i64,
}

/// Runs the killmails command.
pub async fn run(args: &KillmailsArgs, cli: &Cli) -> Result<ExitCode> {
    let groups = args.groups();
    if groups.is_empty() {
        bail!("no entities given; use --corporation, --alliance or --character");
    }

    let app = App::from_cli(cli)?;
    let mut aggregator = app.aggregator();
    if let Some(max_pages) = args.max_pages {
        aggregator = aggregator.with_max_pages(max_pages);
    }

    let (year, month) = args.window();
    info!(entities = groups.len(), year, month, "Fetching killmails");

    let ctx = interruptible_context();
    let report = match aggregator.fetch_window_report(&ctx, &groups, year, month).await {
        Ok(report) => report,
        Err(FetchError::Cancelled) => return Ok(ExitCode::Cancelled),
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &args.output {
        let records = if args.append {
            let existing = load_records(path).await?;
            append_new(existing, &report.records)
        } else {
            report.records.clone()
        };
        save_records(path, &records).await?;
    }

    print_report(&report, args, cli)?;

    Ok(exit_code(&report))
}

/// Runs the single killmail command.
pub async fn run_single(args: &KillmailArgs, cli: &Cli) -> Result<ExitCode> {
    let app = App::from_cli(cli)?;
    let ctx = interruptible_context();

    let zkill = app.zkill.single_killmail(&ctx, args.id).await?;
    let summary = zkill.summary();
    let detail = app.esi.killmail(&ctx, summary.killmail_id, &summary.zkb.hash).await?;
    let record = merge(detail, &summary);

    match cli.format {
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&record)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let system = app.esi.system_name(&ctx, record.solar_system_id).await;
            println!("{}", formatter.format_record_detail(&record, &system));
        }
    }

    Ok(ExitCode::Success)
}

fn print_report(report: &AggregationReport, args: &KillmailsArgs, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let json = if args.report {
                formatter.format(report)?
            } else if cli.quiet {
                formatter.format_report_summary(report)?
            } else {
                formatter.format(&report.records)?
            };
            println!("{json}");
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            if !cli.quiet {
                for record in &report.records {
                    println!("{}", formatter.format_record_line(record));
                }
                println!();
            }
            println!("{}", formatter.format_report_summary(report));
            if args.report {
                for line in formatter.format_report_problems(report) {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}

/// Adds the records of `fresh` whose killmail id is not in `existing` yet.
fn append_new(existing: Vec<MergedRecord>, fresh: &[MergedRecord]) -> Vec<MergedRecord> {
    let known: HashSet<i64> = existing.iter().map(|r| r.killmail_id).collect();
    let addition = fresh
        .iter()
        .filter(|r| !known.contains(&r.killmail_id))
        .cloned()
        .collect();
    aggregate(existing, addition)
}

fn exit_code(report: &AggregationReport) -> ExitCode {
    if report.is_complete() {
        ExitCode::Success
    } else if report.interrupted {
        ExitCode::Cancelled
    } else {
        ExitCode::Incomplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eveapi_core::{Direction, EntityKind, EntityReference};
    use eveapi_sources::{FailedFeed, SkippedRecord};

    fn args(corporation: Vec<i64>, character: Vec<i64>) -> KillmailsArgs {
        KillmailsArgs {
            corporation,
            alliance: vec![],
            character,
            year: Some(2024),
            month: None,
            max_pages: None,
            output: None,
            append: false,
            report: false,
        }
    }

    #[test]
    fn test_groups_keep_kind_order() {
        let groups = args(vec![98_000_001, 98_000_002], vec![90_000_001]).groups();
        let kinds: Vec<EntityKind> = groups.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EntityKind::Corporation, EntityKind::Corporation, EntityKind::Character]
        );
    }

    #[test]
    fn test_window_defaults_to_current_month() {
        let (year, month) = args(vec![1], vec![]).window();
        assert_eq!(year, 2024);
        assert_eq!(month, Utc::now().month());
    }

    fn merged(id: i64, total_value: f64) -> MergedRecord {
        let detail = eveapi_core::DetailRecord {
            killmail_id: id,
            killmail_time: Utc::now(),
            solar_system_id: 30_000_142,
            victim: eveapi_core::Victim::default(),
            attackers: Vec::new(),
        };
        let summary = eveapi_core::SummaryRecord {
            killmail_id: id,
            zkb: eveapi_core::Zkb {
                total_value,
                ..eveapi_core::Zkb::default()
            },
        };
        merge(detail, &summary)
    }

    #[test]
    fn test_append_keeps_existing_and_skips_known_ids() {
        let existing = vec![merged(1, 10.0), merged(2, 20.0)];
        let fresh = vec![merged(2, 99.0), merged(3, 30.0)];

        let combined = append_new(existing, &fresh);
        let ids: Vec<i64> = combined.iter().map(|r| r.killmail_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(combined[1].total_value, 20.0);
    }

    #[test]
    fn test_exit_code_reflects_report() {
        let mut report = AggregationReport::default();
        assert!(matches!(exit_code(&report), ExitCode::Success));

        report.skipped.push(SkippedRecord {
            killmail_id: 1,
            error: "HTTP 422".to_string(),
        });
        assert!(matches!(exit_code(&report), ExitCode::Incomplete));

        report.interrupted = true;
        assert!(matches!(exit_code(&report), ExitCode::Cancelled));

        let mut report = AggregationReport::default();
        report.failed_feeds.push(FailedFeed {
            entity: EntityReference::corporation(1),
            direction: Direction::Losses,
            page: 2,
            error: "HTTP 503".to_string(),
        });
        assert!(matches!(exit_code(&report), ExitCode::Incomplete));
    }
}
