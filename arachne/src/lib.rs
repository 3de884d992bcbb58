pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    CrawlArgs, load_urls_from_file, load_urls_from_source, parse_modes, parse_url_line,
};

// Re-export crawl functionality from arachne-core
pub use arachne_core::crawl::{
    CrawlOptions, CrawlProgressCallback, FetchSource, RecordFormat, execute_crawl,
    extract_url_path,
};
pub use arachne_core::report::generate_crawl_report;
