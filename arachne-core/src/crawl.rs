use anyhow::{Context, Result};
use arachne_scanner::{
    CollectSink, CrawlSummary, DiscoveredPage, FanoutSink, Fetcher, GraphFetcher, HttpFetcher,
    JsonLinesSink, Mode, Sink, Spider, WriterSink,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;
use url::Url;

/// Written between runs when several runs share a text output.
pub const RUN_DIVIDER: &str =
    "-------------------------------------------------------------------";

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub urls: Vec<String>,
    pub max_depth: usize,
    /// Each start URL is crawled once per mode, in this order.
    pub modes: Vec<Mode>,
    pub source: FetchSource,
    pub format: RecordFormat,
    pub show_progress_bars: bool,
}

/// Where page content and links come from
#[derive(Debug, Clone)]
pub enum FetchSource {
    /// Live HTTP fetches
    Http {
        timeout_secs: u64,
        same_domain_only: bool,
    },
    /// A JSON link graph on disk
    Graph(PathBuf),
}

/// How discovered-page records are written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordFormat {
    /// `found: <id> "<content>"`
    Text,
    /// One JSON object per line
    Json,
}

impl RecordFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(RecordFormat::Text),
            "json" | "jsonl" => Some(RecordFormat::Json),
            _ => None,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// One finished run: its totals and the records it emitted.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlRun {
    pub summary: CrawlSummary,
    pub pages: Vec<DiscoveredPage>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlOutcome {
    pub runs: Vec<CrawlRun>,
}

impl CrawlOutcome {
    pub fn total_pages(&self) -> usize {
        self.runs.iter().map(|run| run.pages.len()).sum()
    }

    pub fn pages(&self) -> impl Iterator<Item = &DiscoveredPage> {
        self.runs.iter().flat_map(|run| run.pages.iter())
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Load a link graph from a JSON file
pub fn load_graph(path: &Path) -> Result<GraphFetcher> {
    let graph = GraphFetcher::from_file(path)
        .with_context(|| format!("Failed to load link graph {}", path.display()))?;
    info!("Loaded {} pages from {}", graph.len(), path.display());
    Ok(graph)
}

pub fn build_fetcher(source: &FetchSource) -> Result<Arc<dyn Fetcher>> {
    let fetcher: Arc<dyn Fetcher> = match source {
        FetchSource::Http {
            timeout_secs,
            same_domain_only,
        } => Arc::new(
            HttpFetcher::with_timeout(*timeout_secs)
                .context("Failed to create HTTP client")?
                .with_same_domain_only(*same_domain_only),
        ),
        FetchSource::Graph(path) => Arc::new(load_graph(path)?),
    };
    Ok(fetcher)
}

pub type OutputWriter = Box<dyn Write + Send>;

/// Execute a crawl with the given options
///
/// Records stream to `output` as they are discovered. Every (url, mode) pair
/// is an independent run with its own visited registry.
pub async fn execute_crawl(
    options: CrawlOptions,
    output: OutputWriter,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlOutcome> {
    let CrawlOptions {
        urls,
        max_depth,
        modes,
        source,
        format,
        show_progress_bars,
    } = options;

    let fetcher = build_fetcher(&source)?;

    // Text output keeps a typed handle so run dividers can be written to it
    let (output_sink, text_sink): (Arc<dyn Sink>, Option<Arc<WriterSink<OutputWriter>>>) =
        match format {
            RecordFormat::Text => {
                let sink = Arc::new(WriterSink::new(output));
                let output_sink: Arc<dyn Sink> = sink.clone();
                (output_sink, Some(sink))
            }
            RecordFormat::Json => {
                let output_sink: Arc<dyn Sink> = Arc::new(JsonLinesSink::new(output));
                (output_sink, None)
            }
        };

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let claimed_count = Arc::new(AtomicUsize::new(0));

    let internal_progress_callback: arachne_scanner::ProgressCallback = match progress_bar {
        Some(ref pb) => {
            let pb_clone = pb.clone();
            let count_clone = claimed_count.clone();
            Arc::new(move |_id: &str| {
                let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
                pb_clone.set_message(format!("Crawling... {} pages claimed", count));
                pb_clone.tick();
            })
        }
        None => {
            let count_clone = claimed_count.clone();
            Arc::new(move |_id: &str| {
                count_clone.fetch_add(1, Ordering::Relaxed);
            })
        }
    };

    let total_runs = urls.len() * modes.len();
    let mut outcome = CrawlOutcome::default();

    for url_str in &urls {
        for &mode in &modes {
            let run_index = outcome.runs.len();

            if run_index > 0
                && let Some(ref text) = text_sink
            {
                text.write_line(RUN_DIVIDER);
            }

            if let Some(ref callback) = progress_callback
                && total_runs > 1
            {
                callback(format!(
                    "Run {}/{}: {} ({})",
                    run_index + 1,
                    total_runs,
                    url_str,
                    mode
                ));
            }

            let collected = Arc::new(CollectSink::new());
            let sink = FanoutSink::new()
                .with_sink(output_sink.clone())
                .with_sink(collected.clone());

            let spider = Spider::new(fetcher.clone(), Arc::new(sink))
                .with_progress_callback(internal_progress_callback.clone());
            let summary = spider.run(url_str, max_depth, mode).await;

            output_sink.flush().context("Failed to flush crawl output")?;

            outcome.runs.push(CrawlRun {
                summary,
                pages: collected.take(),
            });
        }
    }

    // Finish progress bar (only if enabled)
    if let Some(ref pb) = progress_bar {
        let total = claimed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!(
            "Crawl complete! {} pages claimed, {} recorded",
            total,
            outcome.total_pages()
        ));
    }

    Ok(outcome)
}
