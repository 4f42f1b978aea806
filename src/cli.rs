//! Command-line interface definitions.
//!
//! All options can be given as flags; the API key can also come from the
//! environment.

use crate::scrapers::Court;
use clap::{Parser, Subcommand};

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Collect news from every court and print it
/// court_news_watch collect
///
/// # Collect, analyze, and keep a dated copy of the report
/// court_news_watch -j ./reports analyze
///
/// # Widen the window for a one-off run
/// court_news_watch --window-days 14 collect
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Optional path to a YAML settings file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Write the report under this directory instead of stdout
    #[arg(short, long, global = true)]
    pub json_output_dir: Option<String>,

    /// Override the recency window in days
    #[arg(long, global = true)]
    pub window_days: Option<u64>,

    /// Override the summary length limit in characters
    #[arg(long, global = true)]
    pub body_char_limit: Option<usize>,

    /// Only scrape these courts (repeatable), e.g. `--court TJ-SP`
    #[arg(long = "court", global = true, value_parser = parse_court)]
    pub courts: Vec<Court>,

    /// API key for the chat-completion service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
}

fn parse_court(raw: &str) -> Result<Court, String> {
    Court::from_id(raw).ok_or_else(|| {
        let known: Vec<_> = Court::ALL.iter().map(|c| c.id()).collect();
        format!("unknown court {raw:?}; expected one of {}", known.join(", "))
    })
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Scrape every court and report the recent news
    Collect,
    /// Scrape every court and have the model flag relevant changes
    Analyze,
}

impl Command {
    /// Label used in report file names.
    pub fn report_kind(self) -> &'static str {
        match self {
            Command::Collect => "collection",
            Command::Analyze => "analysis",
        }
    }
}
