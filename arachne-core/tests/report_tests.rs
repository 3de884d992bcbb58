// Tests for report generation functionality

use arachne_core::crawl::{CrawlOutcome, CrawlRun};
use arachne_core::report::{
    OPAQUE_HOST, ReportFormat, generate_crawl_report, generate_json_report, group_pages_by_host,
    save_report,
};
use arachne_scanner::{CrawlSummary, DiscoveredPage, Mode};
use std::time::Duration;
use tempfile::NamedTempFile;

fn run(start: &str, mode: Mode, pages: &[(&str, &str)], claimed: usize) -> CrawlRun {
    let pages: Vec<DiscoveredPage> = pages
        .iter()
        .map(|(id, content)| DiscoveredPage::new(*id, *content))
        .collect();
    CrawlRun {
        summary: CrawlSummary {
            start: start.to_string(),
            mode,
            max_depth: 2,
            claimed,
            emitted: pages.len(),
            elapsed: Duration::from_millis(12),
        },
        pages,
    }
}

fn sample_outcome() -> CrawlOutcome {
    CrawlOutcome {
        runs: vec![
            run(
                "https://example.com/",
                Mode::Distributed,
                &[
                    ("https://example.com/", "Home"),
                    ("https://example.com/api/data", ""),
                    ("https://docs.example.org/guide", "Guide"),
                ],
                4,
            ),
            run(
                "https://example.com/",
                Mode::Sequential,
                &[
                    ("https://example.com/", "Home"),
                    ("https://example.com/api/data", ""),
                    ("https://docs.example.org/guide", "Guide"),
                ],
                4,
            ),
            run("A", Mode::Sequential, &[("A", "page A"), ("B", "page B")], 2),
        ],
    }
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("TXT"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("Json"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("html"), None);
}

// ============================================================================
// Grouping Tests
// ============================================================================

#[test]
fn test_group_pages_by_host_dedups_across_runs() {
    let outcome = sample_outcome();
    let groups = group_pages_by_host(outcome.pages());

    let hosts: Vec<&str> = groups.keys().map(String::as_str).collect();
    assert_eq!(hosts, vec![OPAQUE_HOST, "docs.example.org", "example.com"]);
    assert_eq!(groups["example.com"].len(), 2);
    assert_eq!(groups["docs.example.org"].len(), 1);
    assert_eq!(groups[OPAQUE_HOST].len(), 2);
}

// ============================================================================
// Text Report Tests
// ============================================================================

#[test]
fn test_generate_crawl_report() {
    let report = generate_crawl_report(&sample_outcome());

    assert!(report.contains("ARACHNE CRAWL REPORT"));
    assert!(report.contains("Runs:         3"));
    assert!(report.contains("Records:      8"));
    assert!(report.contains(
        "https://example.com/ [distributed, depth 2]: 3 pages recorded, 4 claimed"
    ));
    assert!(report.contains("A [sequential, depth 2]: 2 pages recorded, 2 claimed"));
    assert!(report.contains("## example.com\n  2 pages found"));
    assert!(report.contains("  / \"Home\""));
    assert!(report.contains("  /api/data\n"));
    assert!(report.contains("## (opaque)\n  2 pages found"));
    assert!(report.contains("  A \"page A\""));
}

#[test]
fn test_generate_crawl_report_empty() {
    let report = generate_crawl_report(&CrawlOutcome::default());
    assert!(report.contains("Runs:         0"));
    assert!(report.contains("Records:      0"));
    assert!(!report.contains("##"));
}

// ============================================================================
// JSON Report Tests
// ============================================================================

#[test]
fn test_generate_json_report() {
    let json = generate_json_report(&sample_outcome()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let report = &value["report"];
    assert_eq!(report["metadata"]["generator"], "Arachne");
    assert_eq!(report["summary"]["runs"], 3);
    assert_eq!(report["summary"]["total_records"], 8);
    assert_eq!(report["runs"][0]["summary"]["mode"], "distributed");
    assert_eq!(report["runs"][2]["pages"][1]["id"], "B");
    assert_eq!(report["runs"][2]["pages"][1]["content"], "page B");
}

// ============================================================================
// Save Tests
// ============================================================================

#[test]
fn test_save_report() {
    let file = NamedTempFile::new().unwrap();
    save_report("hello report", file.path()).unwrap();
    assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "hello report");
}
