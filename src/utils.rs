//! Utility functions for the recency window, text normalization, and file system checks.
//!
//! This module provides helpers used by every scraper and by the CLI:
//! - The recency window shared by all courts
//! - Whitespace collapsing and bounded truncation for summaries
//! - Log-friendly truncation and JSON truncation detection for model replies
//! - Output directory validation

use chrono::{Days, Local, NaiveDate};
use itertools::Itertools;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Appended to text cut by [`normalize`].
pub const ELLIPSIS: &str = "...";

/// Decide whether `date` falls inside the last `window_days` days.
///
/// The cutoff is local midnight `window_days` days ago and is inclusive, so
/// a date exactly `window_days` days old is kept and one a day older is not.
///
/// # Arguments
///
/// * `date` - Publication day of an item
/// * `window_days` - Size of the recency window
///
/// # Returns
///
/// `true` if `date` is on or after the cutoff. Dates in the future count
/// as recent.
pub fn is_within_window(date: NaiveDate, window_days: u64) -> bool {
    is_within_window_from(date, window_days, Local::now().date_naive())
}

/// [`is_within_window`] against an explicit `today`.
pub fn is_within_window_from(date: NaiveDate, window_days: u64, today: NaiveDate) -> bool {
    match today.checked_sub_days(Days::new(window_days)) {
        Some(cutoff) => date >= cutoff,
        None => true,
    }
}

/// Collapse every whitespace run to one space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Collapse whitespace and bound the result to `limit` characters.
///
/// Text longer than `limit` keeps its first `limit` characters followed by
/// [`ELLIPSIS`]. Empty or whitespace-only input yields an empty string.
///
/// # Arguments
///
/// * `text` - Raw extracted text
/// * `limit` - Maximum number of characters kept before the marker
///
/// # Returns
///
/// At most `limit` characters plus [`ELLIPSIS`].
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize("  a \n b  ", 10), "a b");
/// assert_eq!(normalize("abcdef", 3), "abc...");
/// ```
pub fn normalize(text: &str, limit: usize) -> String {
    let clean = collapse_whitespace(text);
    match clean.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &clean[..cut], ELLIPSIS),
        None => clean,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
        None => s.to_string(),
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A model reply cut off by its token limit fails with an EOF error rather
/// than a syntax error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then writes and removes a
/// probe file.
///
/// # Arguments
///
/// * `path` - The directory path to validate
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
