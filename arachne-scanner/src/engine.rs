use crate::error::ScanError;
use crate::fetch::Fetcher;
use crate::registry::VisitedRegistry;
use crate::sink::Sink;
use crate::tracker::CompletionTracker;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Called with each page id right after it is claimed, before it is fetched.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// How the links of a visited page are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Depth-first, one link at a time, inline.
    Sequential,
    /// One spawned task per link; the run ends when no task is outstanding.
    Distributed,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Sequential => "sequential",
            Mode::Distributed => "distributed",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "seq" => Ok(Mode::Sequential),
            "distributed" | "dist" | "concurrent" => Ok(Mode::Distributed),
            other => Err(ScanError::ParseError(format!("unknown crawl mode '{}'", other))),
        }
    }
}

/// Totals for one finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub start: String,
    pub mode: Mode,
    pub max_depth: usize,
    /// Ids claimed in the registry, whether or not their fetch succeeded.
    pub claimed: usize,
    /// Records written to the sink.
    pub emitted: usize,
    pub elapsed: Duration,
}

/// Bounded-depth crawler over a pluggable [`Fetcher`].
///
/// Every call to [`Spider::run`] starts from an empty registry, so separate
/// runs never share visited state.
pub struct Spider {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn Sink>,
    progress_callback: Option<ProgressCallback>,
}

impl Spider {
    pub fn new(fetcher: Arc<dyn Fetcher>, sink: Arc<dyn Sink>) -> Self {
        Self {
            fetcher,
            sink,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Crawl from `start`, visiting pages at most `max_depth - 1` hops away.
    ///
    /// Resolves once every reachable page within the budget has been
    /// processed. Fetch failures only prune the failing page.
    pub async fn run(&self, start: &str, max_depth: usize, mode: Mode) -> CrawlSummary {
        info!("Starting {} crawl of {} (depth {})", mode, start, max_depth);
        let started = Instant::now();

        let traversal = Arc::new(Traversal {
            fetcher: self.fetcher.clone(),
            sink: self.sink.clone(),
            progress_callback: self.progress_callback.clone(),
            registry: VisitedRegistry::new(),
            tracker: Arc::new(CompletionTracker::new()),
            emitted: AtomicUsize::new(0),
        });

        match mode {
            Mode::Sequential => traversal.walk(start.to_string(), max_depth).await,
            Mode::Distributed => traversal.spawn_visit(start.to_string(), max_depth),
        }
        traversal.tracker.wait().await;

        let summary = CrawlSummary {
            start: start.to_string(),
            mode,
            max_depth,
            claimed: traversal.registry.len().await,
            emitted: traversal.emitted.load(Ordering::Acquire),
            elapsed: started.elapsed(),
        };

        info!(
            "Crawl complete. Visited {} pages ({} claimed) in {:?}",
            summary.emitted, summary.claimed, summary.elapsed
        );
        summary
    }
}

pub async fn run_sequential(
    start: &str,
    max_depth: usize,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn Sink>,
) -> CrawlSummary {
    Spider::new(fetcher, sink)
        .run(start, max_depth, Mode::Sequential)
        .await
}

pub async fn run_distributed(
    start: &str,
    max_depth: usize,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn Sink>,
) -> CrawlSummary {
    Spider::new(fetcher, sink)
        .run(start, max_depth, Mode::Distributed)
        .await
}

/// State for a single run.
struct Traversal {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn Sink>,
    progress_callback: Option<ProgressCallback>,
    registry: VisitedRegistry,
    tracker: Arc<CompletionTracker>,
    emitted: AtomicUsize,
}

impl Traversal {
    /// Claim, fetch and record one page. Returns its links when they should
    /// be followed.
    async fn process(&self, id: &str, depth: usize) -> Option<Vec<String>> {
        if depth == 0 {
            debug!("Depth exhausted at {}", id);
            return None;
        }

        if !self.registry.claim(id).await {
            debug!("Already visited {}", id);
            return None;
        }

        if let Some(ref callback) = self.progress_callback {
            callback(id);
        }

        // A failed page stays claimed and is never retried in this run
        let page = match self.fetcher.fetch(id).await {
            Ok(page) => page,
            Err(e) => {
                debug!("Fetch failed for {}: {}", id, e);
                return None;
            }
        };

        self.sink.emit(id, &page.content);
        self.emitted.fetch_add(1, Ordering::AcqRel);

        Some(page.links)
    }

    /// Depth-first from `start`, driven by an explicit stack so long paths
    /// don't nest futures.
    async fn walk(&self, start: String, depth: usize) {
        let mut pending = vec![(start, depth)];

        while let Some((id, depth)) = pending.pop() {
            if let Some(links) = self.process(&id, depth).await {
                // Reversed so the first link is popped next
                pending.extend(links.into_iter().rev().map(|link| (link, depth - 1)));
            }
        }
    }

    fn spawn_visit(self: &Arc<Self>, id: String, depth: usize) {
        // Counted before the spawn so wait() can't see zero in between
        let token = self.tracker.track();
        let traversal = Arc::clone(self);
        tokio::spawn(async move {
            let _token = token;
            traversal.visit(id, depth).await;
        });
    }

    fn visit(self: Arc<Self>, id: String, depth: usize) -> BoxFuture<'static, ()> {
        async move {
            if let Some(links) = self.process(&id, depth).await {
                for link in links {
                    self.spawn_visit(link, depth - 1);
                }
            }
        }
        .boxed()
    }
}
