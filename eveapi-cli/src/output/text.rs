//! Text output formatting with colors.

use eveapi_core::{LocationInventory, MergedRecord};
use eveapi_sources::AggregationReport;

use super::json::{ClonesOutput, SystemOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Killmails
    // ========================================================================

    /// One line per killmail: time, id, victim ship, value and flags.
    pub fn format_record_line(&self, record: &MergedRecord) -> String {
        let mut line = format!(
            "{}  {:>11}  ship {:>6}  {:>9} ISK",
            self.dim(&record.killmail_time.format("%Y-%m-%d %H:%M").to_string()),
            record.killmail_id,
            record.victim.ship_type_id,
            self.cyan(&format_isk(record.total_value)),
        );

        let flags = flags(record);
        if !flags.is_empty() {
            line.push_str("  ");
            line.push_str(&self.yellow(&flags.join(",")));
        }
        line
    }

    /// Multi-line view of one killmail.
    pub fn format_record_detail(&self, record: &MergedRecord, system_name: &str) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Killmail {} ({})",
            self.bold(&record.killmail_id.to_string()),
            record.killmail_time.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        lines.push("─".repeat(40));

        let system = if system_name.is_empty() {
            record.solar_system_id.to_string()
        } else {
            format!("{system_name} ({})", record.solar_system_id)
        };
        lines.push(format!("System:    {system}"));
        lines.push(format!("Victim:    ship {}", record.victim.ship_type_id));
        if let Some(character) = record.victim.character_id {
            lines.push(format!("           character {character}"));
        }
        lines.push(format!("Items:     {}", record.victim.item_count()));
        lines.push(format!("Attackers: {}", record.attackers.len()));
        lines.push(String::new());
        lines.push(format!(
            "Value:     {} ISK",
            self.cyan(&format_isk(record.total_value))
        ));
        lines.push(format!(
            "           {} dropped, {} destroyed",
            self.green(&format_isk(record.dropped_value)),
            self.red(&format_isk(record.destroyed_value))
        ));
        lines.push(format!("Points:    {}", record.points));

        let flags = flags(record);
        if !flags.is_empty() {
            lines.push(format!("Flags:     {}", self.yellow(&flags.join(", "))));
        }

        lines.join("\n")
    }

    /// One-line summary of an aggregation run.
    pub fn format_report_summary(&self, report: &AggregationReport) -> String {
        let total: f64 = report.records.iter().map(|r| r.total_value).sum();
        let mut line = format!(
            "{} killmails, {} ISK, {} pages",
            self.bold(&report.records.len().to_string()),
            self.cyan(&format_isk(total)),
            report.pages_fetched
        );

        if report.is_complete() {
            line.push_str(&format!(" {}", self.green("(complete)")));
        } else {
            let mut problems = Vec::new();
            if !report.skipped.is_empty() {
                problems.push(format!("{} skipped", report.skipped.len()));
            }
            if !report.failed_feeds.is_empty() {
                problems.push(format!("{} feeds failed", report.failed_feeds.len()));
            }
            if report.interrupted {
                problems.push("interrupted".to_string());
            }
            line.push_str(&format!(" {}", self.red(&format!("({})", problems.join(", ")))));
        }
        line
    }

    /// One line per skipped killmail or failed feed.
    pub fn format_report_problems(&self, report: &AggregationReport) -> Vec<String> {
        let skipped = report.skipped.iter().map(|s| {
            format!(
                "{} killmail {}: {}",
                self.yellow("skipped"),
                s.killmail_id,
                s.error
            )
        });
        let failed = report.failed_feeds.iter().map(|f| {
            format!(
                "{} {} {} page {}: {}",
                self.red("failed"),
                f.entity,
                f.direction,
                f.page,
                f.error
            )
        });
        skipped.chain(failed).collect()
    }

    // ========================================================================
    // Locations
    // ========================================================================

    /// A solar system with its name when known.
    pub fn format_system(&self, system: &SystemOutput) -> String {
        if system.name.is_empty() {
            system.system_id.to_string()
        } else {
            format!("{} {}", self.bold(&system.name), self.dim(&format!("({})", system.system_id)))
        }
    }

    /// Home and jump clone systems of a character.
    pub fn format_clones(&self, clones: &ClonesOutput) -> String {
        let mut lines = vec![format!("Clones of character {}", clones.character_id)];
        lines.push("─".repeat(40));

        match &clones.home {
            Some(home) => lines.push(format!("Home:  {}", self.format_system(home))),
            None => lines.push(format!("Home:  {}", self.dim("not set"))),
        }

        let jump_clones = if clones.home.is_some() {
            clones.systems.get(1..).unwrap_or_default()
        } else {
            &clones.systems[..]
        };
        if jump_clones.is_empty() {
            lines.push(format!("Jump:  {}", self.dim("none")));
        }
        for system in jump_clones {
            lines.push(format!("Jump:  {}", self.format_system(system)));
        }

        lines.join("\n")
    }

    // ========================================================================
    // Assets
    // ========================================================================

    /// One line per cyno stash: location and item counts.
    pub fn format_inventory(&self, inventory: &LocationInventory) -> String {
        let items: Vec<String> = inventory
            .items
            .iter()
            .map(|(name, quantity)| format!("{name} x{quantity}"))
            .collect();
        format!(
            "{} {} {}  {}",
            inventory.location_type,
            self.bold(&inventory.location_id.to_string()),
            self.dim(&format!("({})", inventory.location_flag)),
            self.cyan(&items.join(", "))
        )
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

fn flags(record: &MergedRecord) -> Vec<&'static str> {
    [(record.solo, "solo"), (record.npc, "npc"), (record.awox, "awox")]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
}

/// Formats an ISK amount with a B/M/K suffix.
pub fn format_isk(n: f64) -> String {
    if n >= 1_000_000_000.0 {
        format!("{:.2}B", n / 1_000_000_000.0)
    } else if n >= 1_000_000.0 {
        format!("{:.2}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.1}K", n / 1_000.0)
    } else {
        format!("{n:.0}")
    }
}

// ============================================================================
// Tests
// ============================================================================
