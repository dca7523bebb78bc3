//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

use chrono::{TimeZone, Utc};
use eveapi_core::{
    Asset, DetailRecord, Direction, EntityReference, MergedRecord, SummaryRecord, Victim, Zkb,
    cyno_inventories, merge,
};
use eveapi_sources::{AggregationReport, FailedFeed, SkippedRecord};

use super::json::{ClonesOutput, JsonFormatter, SystemOutput};
use super::text::TextFormatter;

fn record(id: i64, total_value: f64, solo: bool) -> MergedRecord {
    let detail = DetailRecord {
        killmail_id: id,
        killmail_time: Utc.with_ymd_and_hms(2024, 5, 3, 21, 14, 0).unwrap(),
        solar_system_id: 30_002_187,
        victim: Victim {
            character_id: Some(90_000_001),
            ship_type_id: 670,
            ..Victim::default()
        },
        attackers: Vec::new(),
    };
    let summary = SummaryRecord {
        killmail_id: id,
        zkb: Zkb {
            hash: format!("hash{id}"),
            total_value,
            dropped_value: total_value / 4.0,
            destroyed_value: total_value * 3.0 / 4.0,
            points: 10,
            solo,
            ..Zkb::default()
        },
    };
    merge(detail, &summary)
}

fn system(id: i64, name: &str) -> SystemOutput {
    SystemOutput {
        system_id: id,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod text_formatter_tests {
    use super::*;

    #[test]
    fn test_record_line() {
        let formatter = TextFormatter::new(false);
        let line = formatter.format_record_line(&record(117_650_398, 45_600_000.0, true));

        assert!(line.starts_with("2024-05-03 21:14"));
        assert!(line.contains("117650398"));
        assert!(line.contains("ship    670"));
        assert!(line.contains("45.60M ISK"));
        assert!(line.ends_with("solo"));
    }

    #[test]
    fn test_record_line_without_flags() {
        let formatter = TextFormatter::new(false);
        let line = formatter.format_record_line(&record(1, 500.0, false));
        assert!(line.ends_with("500 ISK"));
    }

    #[test]
    fn test_record_line_with_colors() {
        let formatter = TextFormatter::new(true);
        let line = formatter.format_record_line(&record(1, 500.0, true));
        assert!(line.contains("\x1b[36m"), "value should be cyan");
        assert!(line.contains("\x1b[33msolo"), "flags should be yellow");
    }

    #[test]
    fn test_record_detail() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_record_detail(&record(7, 1_234_000_000.0, false), "Amamake");

        assert!(output.starts_with("Killmail 7 (2024-05-03 21:14:00 UTC)"));
        assert!(output.contains("System:    Amamake (30002187)"));
        assert!(output.contains("character 90000001"));
        assert!(output.contains("Value:     1.23B ISK"));
        assert!(!output.contains("Flags:"));
    }

    #[test]
    fn test_record_detail_without_system_name() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_record_detail(&record(7, 1.0, true), "");
        assert!(output.contains("System:    30002187\n"));
        assert!(output.contains("Flags:     solo"));
    }

    #[test]
    fn test_complete_report_summary() {
        let formatter = TextFormatter::new(false);
        let report = AggregationReport {
            records: vec![record(1, 1_000_000.0, false), record(2, 2_000_000.0, false)],
            pages_fetched: 6,
            ..AggregationReport::default()
        };

        assert_eq!(
            formatter.format_report_summary(&report),
            "2 killmails, 3.00M ISK, 6 pages (complete)"
        );
        assert!(formatter.format_report_problems(&report).is_empty());
    }

    #[test]
    fn test_incomplete_report() {
        let formatter = TextFormatter::new(false);
        let report = AggregationReport {
            skipped: vec![SkippedRecord {
                killmail_id: 3,
                error: "HTTP 422".to_string(),
            }],
            failed_feeds: vec![FailedFeed {
                entity: EntityReference::corporation(98_000_001),
                direction: Direction::Kills,
                page: 2,
                error: "HTTP 503".to_string(),
            }],
            interrupted: true,
            ..AggregationReport::default()
        };

        let summary = formatter.format_report_summary(&report);
        assert!(summary.ends_with("(1 skipped, 1 feeds failed, interrupted)"));

        let problems = formatter.format_report_problems(&report);
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0], "skipped killmail 3: HTTP 422");
        assert!(problems[1].starts_with("failed "));
        assert!(problems[1].ends_with("page 2: HTTP 503"));
    }

    #[test]
    fn test_format_system() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_system(&system(30_000_142, "Jita")), "Jita (30000142)");
        assert_eq!(formatter.format_system(&system(30_000_142, "")), "30000142");
    }

    #[test]
    fn test_format_clones_splits_home() {
        let formatter = TextFormatter::new(false);
        let clones = ClonesOutput {
            character_id: 90_000_001,
            home: Some(system(30_000_142, "Jita")),
            systems: vec![system(30_000_142, "Jita"), system(30_002_187, "Amamake")],
        };

        let output = formatter.format_clones(&clones);
        assert!(output.contains("Home:  Jita (30000142)"));
        assert!(output.contains("Jump:  Amamake (30002187)"));
        assert_eq!(output.matches("Jump:").count(), 1);
    }

    #[test]
    fn test_format_inventory() {
        let formatter = TextFormatter::new(false);
        let assets = [
            Asset {
                type_id: 16_273,
                quantity: 250,
                location_flag: "Hangar".to_string(),
                location_type: "station".to_string(),
                location_id: 60_003_760,
            },
            Asset {
                type_id: 32_880,
                quantity: 1,
                location_flag: "Hangar".to_string(),
                location_type: "station".to_string(),
                location_id: 60_003_760,
            },
        ];
        let stashes = cyno_inventories(90_000_001, &assets);

        assert_eq!(
            formatter.format_inventory(&stashes[0]),
            "station 60003760 (Hangar)  Liquid Ozone x250, Venture x1"
        );
    }

    #[test]
    fn test_format_clones_without_home() {
        let formatter = TextFormatter::new(false);
        let clones = ClonesOutput {
            character_id: 90_000_001,
            home: None,
            systems: vec![],
        };

        let output = formatter.format_clones(&clones);
        assert!(output.contains("Home:  not set"));
        assert!(output.contains("Jump:  none"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::*;

    #[test]
    fn test_records_keep_zkillboard_field_names() {
        let formatter = JsonFormatter::new(false);
        let output = formatter.format(&vec![record(1, 10.0, true)]).unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["killmail_id"], 1);
        assert_eq!(value[0]["totalValue"], 10.0);
        assert_eq!(value[0]["solo"], true);
        assert_eq!(value[0]["hash"], "hash1");
    }

    #[test]
    fn test_report_summary_counts() {
        let formatter = JsonFormatter::new(false);
        let report = AggregationReport {
            records: vec![record(1, 10.0, false), record(2, 5.0, false)],
            skipped: vec![SkippedRecord {
                killmail_id: 3,
                error: "HTTP 422".to_string(),
            }],
            pages_fetched: 4,
            ..AggregationReport::default()
        };

        let value: serde_json::Value =
            serde_json::from_str(&formatter.format_report_summary(&report).unwrap()).unwrap();
        assert_eq!(value["records"], 2);
        assert_eq!(value["skipped"], 1);
        assert_eq!(value["pagesFetched"], 4);
        assert_eq!(value["totalValue"], 15.0);
        assert_eq!(value["complete"], false);
    }

    #[test]
    fn test_clones_omit_missing_home() {
        let formatter = JsonFormatter::new(false);
        let clones = ClonesOutput {
            character_id: 1,
            home: None,
            systems: vec![system(30_000_142, "Jita")],
        };

        assert_eq!(
            formatter.format(&clones).unwrap(),
            r#"{"character_id":1,"systems":[{"system_id":30000142,"name":"Jita"}]}"#
        );
    }
}
