//! # Court News Watch
//!
//! Harvests recent news from several Brazilian court portals, normalizes
//! them into one shape, and optionally asks a language model to flag
//! announcements that affect automations: new security layers, anti-bot
//! measures, platform migrations, scheduled downtime.
//!
//! ## Usage
//!
//! ```sh
//! court_news_watch collect
//! OPENAI_API_KEY=... court_news_watch -j ./reports analyze
//! ```
//!
//! ## Architecture
//!
//! 1. **Scraping**: one scraper per court, run one after another
//! 2. **Collection**: failed courts become warnings, the rest become results
//! 3. **Analysis** (optional): the results go to the model in one request
//! 4. **Output**: the report is printed or written as a dated JSON file

use clap::Parser;
use serde::Serialize;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod api;
mod cli;
mod collect;
mod config;
mod fetch;
mod models;
mod outputs;
mod scrapers;
mod utils;

use analysis::collect_and_analyze;
use api::{OpenAiChat, RetryChat};
use cli::{Cli, Command};
use collect::Collector;
use config::Settings;
use fetch::HttpFetcher;
use outputs::json;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init (stderr; stdout carries the report) ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("court_news_watch starting up");

    let args = Cli::parse();
    debug!(command = ?args.command, ?args.json_output_dir, ?args.config, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(days) = args.window_days {
        settings.crawl.window_days = days;
    }
    if let Some(limit) = args.body_char_limit {
        settings.crawl.body_char_limit = limit;
    }
    info!(
        window_days = settings.crawl.window_days,
        body_char_limit = settings.crawl.body_char_limit,
        "Effective crawl settings"
    );

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    let fetcher = HttpFetcher::new(&settings.http)?;
    let collector = if args.courts.is_empty() {
        Collector::new(&fetcher, &settings.crawl)
    } else {
        Collector::with_courts(&fetcher, &settings.crawl, args.courts.clone())
    };

    match args.command {
        Command::Collect => {
            let outcome = collector.collect_all().await;
            emit(&outcome, args.command, args.json_output_dir.as_deref()).await?;
        }
        Command::Analyze => {
            let chat = OpenAiChat::new(&settings.llm, args.openai_api_key.as_deref())?;
            let chat = RetryChat::new(
                chat,
                settings.llm.max_retries,
                Duration::from_millis(settings.llm.retry_base_delay_ms),
            );
            let report = match collect_and_analyze(&collector, &chat).await {
                Ok(report) => report,
                Err(e) => {
                    error!(error = %e, "Analysis failed");
                    return Err(e.into());
                }
            };
            emit(&report, args.command, args.json_output_dir.as_deref()).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Print `report` to stdout, or write it under `json_output_dir`.
async fn emit<T: Serialize>(
    report: &T,
    command: Command,
    json_output_dir: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    match json_output_dir {
        Some(dir) => {
            let path = json::write_report(report, dir, command.report_kind()).await?;
            info!(%path, "Report saved");
        }
        None => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}
