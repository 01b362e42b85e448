//! Shortcode-Sweep main entry point
//!
//! This is the command-line interface for the short-link enumerator.

use anyhow::Context;
use clap::Parser;
use shortcode_sweep::config::{load_config_with_hash, validate, ScanSession};
use shortcode_sweep::output::{load_statistics, print_statistics};
use shortcode_sweep::resolver::ReqwestTransport;
use shortcode_sweep::scanner::{test_url, ScanSummary, Scanner};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shortcode-Sweep: a resumable short-link enumerator
///
/// Walks every suffix of the given length in order, resolves each short
/// link and appends the outcome to a CSV store. Rerunning against the same
/// store continues after the last recorded suffix.
#[derive(Parser, Debug)]
#[command(name = "shortcode-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A resumable short-link enumerator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// URL suffix length
    #[arg(short, long)]
    length: Option<usize>,

    /// Output CSV file
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Delay between request starts in seconds
    #[arg(short, long)]
    delay: Option<f64>,

    /// Resume from a specific suffix (overrides auto-resume)
    #[arg(long, value_name = "SUFFIX")]
    start_from: Option<String>,

    /// Resolve a single short URL, record it and exit
    #[arg(long, value_name = "URL", conflicts_with_all = ["stats", "start_from"])]
    test_url: Option<String>,

    /// Do not record not-found results
    #[arg(long = "no-404")]
    no_404: bool,

    /// Stop after this many requests
    #[arg(long, value_name = "N")]
    limit: Option<u64>,

    /// Short URL prefix, e.g. https://goo.gl/
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Show statistics from the output store and exit
    #[arg(long)]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply(&self, session: &mut ScanSession) {
        if let Some(length) = self.length {
            session.scan.length = length;
        }
        if let Some(output) = &self.output {
            session.scan.output_path = output.clone();
        }
        if let Some(delay) = self.delay {
            session.scan.delay_seconds = delay;
        }
        if let Some(start) = &self.start_from {
            session.scan.start_from = Some(start.clone());
        }
        if self.no_404 {
            session.scan.skip_not_found = true;
        }
        if let Some(limit) = self.limit {
            session.scan.max_requests = Some(limit);
        }
        if let Some(base_url) = &self.base_url {
            session.http.base_url = base_url.clone();
        }
        if let Some(timeout) = self.timeout {
            session.http.timeout_seconds = timeout;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut session = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (session, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            session
        }
        None => ScanSession::default(),
    };

    cli.apply(&mut session);
    validate(&session).context("invalid settings")?;

    if cli.stats {
        return handle_stats(&session);
    }

    let transport =
        ReqwestTransport::new(&session.http).context("failed to build HTTP client")?;

    match &cli.test_url {
        Some(url) => handle_test_url(&session, transport, url).await,
        None => handle_scan(session, transport).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shortcode_sweep=info,warn"),
            1 => EnvFilter::new("shortcode_sweep=debug,info"),
            2 => EnvFilter::new("shortcode_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: summarizes the output store
fn handle_stats(session: &ScanSession) -> anyhow::Result<()> {
    let path = &session.scan.output_path;
    println!("Output store: {}\n", path.display());

    let stats = load_statistics(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --test-url mode: resolves one URL without enumerating
async fn handle_test_url(
    session: &ScanSession,
    transport: ReqwestTransport,
    url: &str,
) -> anyhow::Result<()> {
    let record = test_url(session, transport, url)
        .await
        .with_context(|| format!("failed to test {}", url))?;

    tracing::info!(
        "Result: {} (Status: {})",
        record.outcome.destination_field(),
        record.outcome.status_tag()
    );
    Ok(())
}

/// Handles the main scan until completion or Ctrl-C
async fn handle_scan(session: ScanSession, transport: ReqwestTransport) -> anyhow::Result<()> {
    let output = session.scan.output_path.clone();
    let mut scanner = Scanner::new(session, transport)
        .with_context(|| format!("failed to prepare scan of {}", output.display()))?;

    let finished = tokio::select! {
        result = scanner.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match finished {
        Some(Ok(summary)) => {
            report(&summary);
            Ok(())
        }
        Some(Err(e)) => {
            tracing::error!("Scan failed: {}", e);
            if let Some(hint) = scanner.resume_hint() {
                tracing::error!("Resume with --start-from {}", hint);
            }
            Err(e.into())
        }
        None => {
            let progress = scanner.progress();
            tracing::info!(
                "Scan interrupted. Processed: {} | Found: {}",
                progress.processed,
                progress.found
            );
            if let Some(hint) = scanner.resume_hint() {
                tracing::info!("Resume with --start-from {} (index: {})", hint, hint.index());
            }
            Ok(())
        }
    }
}

fn report(summary: &ScanSummary) {
    if let Some(last) = &summary.last_attempted {
        tracing::info!("Last attempted: {}", last);
    }
    match &summary.next_candidate {
        Some(next) => tracing::info!("Next run starts at {}", next),
        None if summary.exhausted => tracing::info!("Every candidate has been attempted"),
        None => {}
    }
}
