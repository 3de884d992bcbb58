use anyhow::{Context, Result, bail};
use arachne_core::crawl::{
    CrawlOptions, CrawlOutcome, CrawlProgressCallback, FetchSource, OutputWriter, RecordFormat,
    execute_crawl,
};
use arachne_core::report::{ReportFormat, generate_crawl_report, generate_json_report, save_report};
use arachne_scanner::Mode;
use clap::ArgMatches;
use colored::Colorize;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use url::Url;

// Helper functions for crawl handler

/// Load start ids from either a file or a single `--url` argument
///
/// With `verbatim` set (graph crawls) ids are taken as written; otherwise
/// each one must parse as a URL, with `http://` prepended when it has no scheme.
pub fn load_urls_from_source(
    url: Option<&String>,
    hosts_file: Option<&PathBuf>,
    verbatim: bool,
) -> Result<Vec<String>> {
    if let Some(hosts_file_path) = hosts_file {
        if verbatim {
            load_ids_from_file(hosts_file_path)
        } else {
            load_urls_from_file(hosts_file_path)
        }
    } else if let Some(url) = url {
        if verbatim {
            return Ok(vec![url.clone()]);
        }
        match parse_url_line(url.trim()) {
            Some(parsed) => Ok(vec![parsed]),
            None => bail!("Invalid URL '{}'", url),
        }
    } else {
        bail!("Either --url or --hosts-file must be provided")
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hosts file {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let urls: Vec<String> = read_lines(path)?
        .iter()
        .filter_map(|line| parse_url_line(line))
        .collect();

    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Load opaque page ids from a file, one per line
pub fn load_ids_from_file(path: &Path) -> Result<Vec<String>> {
    let ids = read_lines(path)?;
    if ids.is_empty() {
        bail!("No page ids found in {}", path.display());
    }
    Ok(ids)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    // Try to parse as-is
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    // Try adding http://
    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("⚠️  Skipping invalid URL '{}'", line);
    None
}

/// `both` expands to a distributed run followed by a sequential one
pub fn parse_modes(s: &str) -> Result<Vec<Mode>> {
    if s.eq_ignore_ascii_case("both") {
        return Ok(vec![Mode::Distributed, Mode::Sequential]);
    }
    Ok(vec![s.parse::<Mode>()?])
}

pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

pub fn log_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Everything `crawl` needs, resolved from the command line
#[derive(Debug, Clone)]
pub struct CrawlArgs {
    pub urls: Vec<String>,
    pub max_depth: usize,
    pub modes: Vec<Mode>,
    pub source: FetchSource,
    pub format: RecordFormat,
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub report_format: ReportFormat,
    pub summary: bool,
}

impl CrawlArgs {
    pub fn from_matches(sub_matches: &ArgMatches) -> Result<Self> {
        let url = sub_matches.get_one::<String>("url");
        let hosts_file = sub_matches
            .get_one::<PathBuf>("hosts-file")
            .map(|p| expand_path(p));
        let graph = sub_matches
            .get_one::<PathBuf>("graph")
            .map(|p| expand_path(p));

        let urls = load_urls_from_source(url, hosts_file.as_ref(), graph.is_some())?;

        let max_depth = *sub_matches.get_one::<usize>("depth").unwrap_or(&2);
        let modes = parse_modes(
            sub_matches
                .get_one::<String>("mode")
                .map(String::as_str)
                .unwrap_or("both"),
        )?;

        let source = match graph {
            Some(path) => FetchSource::Graph(path),
            None => FetchSource::Http {
                timeout_secs: *sub_matches.get_one::<u64>("timeout").unwrap_or(&10),
                same_domain_only: sub_matches.get_flag("same-domain"),
            },
        };

        let format = sub_matches
            .get_one::<String>("format")
            .and_then(|f| RecordFormat::from_str(f))
            .unwrap_or(RecordFormat::Text);
        let report_format = sub_matches
            .get_one::<String>("report-format")
            .and_then(|f| ReportFormat::from_str(f))
            .unwrap_or(ReportFormat::Text);

        Ok(CrawlArgs {
            urls,
            max_depth,
            modes,
            source,
            format,
            output: sub_matches
                .get_one::<PathBuf>("output")
                .map(|p| expand_path(p)),
            report: sub_matches
                .get_one::<PathBuf>("report")
                .map(|p| expand_path(p)),
            report_format,
            summary: sub_matches.get_flag("summary"),
        })
    }
}

fn open_output(path: Option<&PathBuf>) -> Result<OutputWriter> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

/// Run the crawl described by `args`, then write any requested reports
pub async fn run_crawl(args: CrawlArgs, quiet: bool) -> Result<CrawlOutcome> {
    let mode_names: Vec<&str> = args.modes.iter().map(Mode::as_str).collect();

    if !quiet {
        eprintln!(
            "{} Crawling {} start page(s) | depth {} | mode {}",
            "🕸".cyan(),
            args.urls.len(),
            args.max_depth,
            mode_names.join(", ")
        );
    }
    debug!("Crawl source: {:?}", args.source);

    let output = open_output(args.output.as_ref())?;

    let options = CrawlOptions {
        urls: args.urls,
        max_depth: args.max_depth,
        modes: args.modes,
        source: args.source,
        format: args.format,
        // The spinner shares the terminal with records on stdout
        show_progress_bars: !quiet && args.output.is_some(),
    };

    let progress_callback: Option<CrawlProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            eprintln!("{} {}", "→".blue(), msg);
        }))
    };

    let outcome = execute_crawl(options, output, progress_callback).await?;

    if !quiet {
        eprintln!(
            "{} Crawl complete! {} page(s) recorded",
            "✓".green().bold(),
            outcome.total_pages()
        );
    }

    if let Some(path) = args.report {
        let content = match args.report_format {
            ReportFormat::Text => generate_crawl_report(&outcome),
            ReportFormat::Json => {
                generate_json_report(&outcome).context("Failed to serialise report")?
            }
        };
        save_report(&content, &path)
            .with_context(|| format!("Failed to save report {}", path.display()))?;
        if !quiet {
            eprintln!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
    }

    if args.summary {
        eprint!("{}", generate_crawl_report(&outcome));
    }

    Ok(outcome)
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    // Logs go to stderr so records on stdout stay clean
    let verbosity = sub_matches.get_count("verbose");
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level(verbosity, quiet))
        .with_writer(io::stderr)
        .try_init();

    let result = match CrawlArgs::from_matches(sub_matches) {
        Ok(args) => run_crawl(args, quiet).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
