//! Crawlscope main entry point
//!
//! This is the command-line interface for the Crawlscope site crawler.

use anyhow::Context;
use clap::Parser;
use crawlscope::config::{load_config_with_hash, Config};
use crawlscope::output::{
    print_metrics, print_progress, print_search_results, write_markdown_report,
};
use crawlscope::service::prepare_search;
use crawlscope::storage::{open_storage, PageStore};
use crawlscope::CrawlService;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Crawlscope: a polite site crawler with search and site-health metrics
///
/// Crawlscope crawls a site from a start URL while respecting robots.txt and
/// per-host delays, indexes page content for search and reports duplicate
/// content, broken links and other site-health issues.
#[derive(Parser, Debug)]
#[command(name = "crawlscope")]
#[command(version)]
#[command(about = "A polite site crawler with search and site-health metrics", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "report")]
    dry_run: bool,

    /// Search the crawled pages; wrap the query in double quotes for a phrase
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Comma-separated fields to search (body, title, meta, alt)
    #[arg(long, value_delimiter = ',', requires = "search")]
    fields: Vec<String>,

    /// Print metrics and search results as JSON
    #[arg(long)]
    json: bool,

    /// Also write the metrics as a markdown report
    #[arg(long, value_name = "PATH")]
    markdown: Option<PathBuf>,

    /// Recompute metrics for a stored job instead of crawling
    #[arg(long, value_name = "JOB_ID")]
    report: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let store: Option<Arc<dyn PageStore>> = match &config.output.database_path {
        Some(path) => {
            let store = open_storage(Path::new(path))
                .with_context(|| format!("failed to open database {}", path))?;
            Some(Arc::new(store))
        }
        None => None,
    };
    let service = CrawlService::new(config.user_agent.clone(), store);

    match &cli.report {
        Some(job_id) => handle_report(&service, job_id, &cli),
        None => handle_crawl(&service, &config, &cli).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawlscope=info,warn"),
            1 => EnvFilter::new("crawlscope=debug,info"),
            2 => EnvFilter::new("crawlscope=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    let job = &config.crawl;

    println!("=== Crawlscope Dry Run ===\n");

    println!("Crawl:");
    println!("  Start URL: {}", job.start_url);
    println!("  Max pages: {}", job.max_pages);
    println!("  Same domain only: {}", job.same_domain_only);
    println!("  Concurrency: {}", job.concurrency);
    println!("  Per-host delay: {}s", job.per_host_delay);
    println!("  Max per host: {}", job.max_per_host);
    println!("  Request timeout: {}s", job.request_timeout);
    println!("  Max retries: {}", job.max_retries);
    let fields: Vec<&str> = job.search_fields.iter().map(|f| f.as_str()).collect();
    println!("  Search fields: {}", fields.join(", "));

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    match &config.output.database_path {
        Some(path) => println!("  Database: {}", path),
        None => println!("  Database: (none, results kept in memory)"),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(service: &CrawlService, config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let id = service.start_crawl(config.crawl.clone())?;
    tracing::info!("Started crawl {} of {}", id, config.crawl.start_url);

    let wait = service.wait(id);
    tokio::pin!(wait);
    let mut ticker = tokio::time::interval(Duration::from_secs(5));

    let final_progress = loop {
        tokio::select! {
            progress = &mut wait => break progress?,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted, stopping crawl {}", id);
                service.stop_crawl(id)?;
            }
            _ = ticker.tick() => {
                if !cli.quiet {
                    print_progress(&id.to_string(), &service.crawl_status(id)?);
                }
            }
        }
    };

    print_progress(&id.to_string(), &final_progress);
    println!();

    let metrics = service.metrics(id)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print_metrics(&metrics);
    }

    if let Some(path) = &cli.markdown {
        write_markdown_report(&id.to_string(), &metrics, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("✓ Report written to: {}", path.display());
    }

    if let Some(query) = &cli.search {
        let hits = service.search(id, query, &cli.fields)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        } else {
            print_search_results(query, &hits);
        }
    }

    if config.output.database_path.is_some() {
        println!("\nResults stored as job {}", id);
    }

    Ok(())
}

/// Handles the --report mode: recomputes metrics for a stored job
fn handle_report(service: &CrawlService, job_id: &str, cli: &Cli) -> anyhow::Result<()> {
    let results = service
        .load_stored(job_id)
        .with_context(|| format!("failed to load job {}", job_id))?;
    tracing::info!("Loaded {} stored pages", results.page_count());

    let metrics = results.metrics();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print_metrics(&metrics);
    }

    if let Some(path) = &cli.markdown {
        write_markdown_report(job_id, &metrics, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("✓ Report written to: {}", path.display());
    }

    if let Some(query) = &cli.search {
        let (parsed, fields) = prepare_search(query, &cli.fields, &results.indexed_fields())?;
        let hits = results.search(&parsed, &fields);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        } else {
            print_search_results(query, &hits);
        }
    }

    Ok(())
}
