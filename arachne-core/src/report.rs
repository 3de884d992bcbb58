// Report generation from crawl outcomes

use crate::crawl::{CrawlOutcome, extract_url_path};
use arachne_scanner::DiscoveredPage;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use url::Url;

/// Host bucket for identifiers that are not URLs.
pub const OPAQUE_HOST: &str = "(opaque)";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

/// Every distinct page across all runs, keyed by host then identifier.
pub fn group_pages_by_host<'a>(
    pages: impl Iterator<Item = &'a DiscoveredPage>,
) -> BTreeMap<String, BTreeSet<&'a DiscoveredPage>> {
    let mut by_host: BTreeMap<String, BTreeSet<&DiscoveredPage>> = BTreeMap::new();

    for page in pages {
        let host = Url::parse(&page.id)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| OPAQUE_HOST.to_string());
        by_host.entry(host).or_default().insert(page);
    }

    by_host
}

pub fn generate_crawl_report(outcome: &CrawlOutcome) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str("                           ARACHNE CRAWL REPORT\n");
    report.push_str(RULE);
    report.push_str("\n\n");
    report.push_str(&format!(
        "Generated:    {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    report.push_str(&format!("Runs:         {}\n", outcome.runs.len()));
    report.push_str(&format!("Records:      {}\n\n", outcome.total_pages()));

    report.push_str("# Summary:\n");
    for run in &outcome.runs {
        let summary = &run.summary;
        report.push_str(&format!(
            "  {} [{}, depth {}]: {} pages recorded, {} claimed, {:.2?}\n",
            summary.start,
            summary.mode,
            summary.max_depth,
            summary.emitted,
            summary.claimed,
            summary.elapsed
        ));
    }

    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    // Display distinct pages grouped by host
    for (host, pages) in group_pages_by_host(outcome.pages()) {
        let distinct_ids: BTreeSet<&str> = pages.iter().map(|p| p.id.as_str()).collect();
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} pages found\n\n", distinct_ids.len()));

        for page in pages {
            let label = if host == OPAQUE_HOST {
                page.id.clone()
            } else {
                extract_url_path(&page.id)
            };

            if page.content.is_empty() {
                report.push_str(&format!("  {}\n", label));
            } else {
                report.push_str(&format!("  {} {:?}\n", label, page.content));
            }
        }
        report.push('\n');
    }

    report
}

pub fn generate_json_report(outcome: &CrawlOutcome) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Arachne",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "summary": {
                "runs": outcome.runs.len(),
                "total_records": outcome.total_pages(),
            },
            "runs": outcome.runs,
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
