//! JSON output formatting.

use anyhow::Result;
use eveapi_core::SystemId;
use eveapi_sources::AggregationReport;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// Counts of one aggregation run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummaryOutput {
    pub records: usize,
    pub skipped: usize,
    pub failed_feeds: usize,
    pub pages_fetched: u32,
    pub total_value: f64,
    pub complete: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

impl From<&AggregationReport> for ReportSummaryOutput {
    fn from(report: &AggregationReport) -> Self {
        Self {
            records: report.records.len(),
            skipped: report.skipped.len(),
            failed_feeds: report.failed_feeds.len(),
            pages_fetched: report.pages_fetched,
            total_value: report.records.iter().map(|r| r.total_value).sum(),
            complete: report.is_complete(),
            interrupted: report.interrupted,
        }
    }
}

/// A resolved solar system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemOutput {
    pub system_id: SystemId,
    /// Empty when ESI could not provide it.
    pub name: String,
}

/// Clone locations of a character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClonesOutput {
    pub character_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<SystemOutput>,
    /// Home first, then every jump clone.
    pub systems: Vec<SystemOutput>,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats the counts of an aggregation run.
    pub fn format_report_summary(&self, report: &AggregationReport) -> Result<String> {
        self.format(&ReportSummaryOutput::from(report))
    }
}

// ============================================================================
// Tests
// ============================================================================
