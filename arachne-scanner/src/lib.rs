pub mod engine;
pub mod error;
pub mod fetch;
pub mod http;
pub mod page;
pub mod registry;
pub mod sink;
pub mod tracker;

pub use engine::{CrawlSummary, Mode, ProgressCallback, Spider, run_distributed, run_sequential};
pub use error::ScanError;
pub use fetch::{FetchFn, Fetcher, GraphFetcher};
pub use http::HttpFetcher;
pub use page::{DiscoveredPage, Page};
pub use registry::VisitedRegistry;
pub use sink::{CollectSink, FanoutSink, JsonLinesSink, Sink, WriterSink};
pub use tracker::{CompletionTracker, TaskToken};
