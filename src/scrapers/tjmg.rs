//! TJ-MG news scraper.
//!
//! The portal's news page carries two independently ordered blocks: a
//! featured block where every card has its own date, and a chronological
//! list where a subheading date applies to every entry below it until the
//! next subheading. Both blocks are scanned in full and each item is
//! filtered against the window on its own; an item whose URL was already
//! collected is dropped.

use super::{ScrapeError, find_dmy, parse_url, select_href, select_text, selector, ymd};
use crate::config::CrawlSettings;
use crate::fetch::PageFetcher;
use crate::models::NewsItem;
use crate::utils::{collapse_whitespace, is_within_window, normalize};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::{debug, info, instrument};

pub const BASE_URL: &str = "https://www.tjmg.jus.br";
pub const LISTING_URL: &str = "https://www.tjmg.jus.br/portal-tjmg/noticias/";

static LONG_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})\s+de\s+([a-zç]+)\s+-\s+(\d{4})").unwrap());

fn month_number(name: &str) -> &'static str {
    match name.to_lowercase().as_str() {
        "janeiro" => "01",
        "fevereiro" => "02",
        "março" | "marco" => "03",
        "abril" => "04",
        "maio" => "05",
        "junho" => "06",
        "julho" => "07",
        "agosto" => "08",
        "setembro" => "09",
        "outubro" => "10",
        "novembro" => "11",
        "dezembro" => "12",
        _ => "01",
    }
}

/// Parse `16/02/2026` or `13 de fevereiro - 2026`.
///
/// # Arguments
///
/// * `raw` - Date text as printed on the page, possibly with surrounding words
///
/// # Returns
///
/// The calendar day, or `None` when no real day can be read. An unknown
/// month name is read as January.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Some(date) = find_dmy(raw) {
        return Some(date);
    }
    let caps = LONG_DATE.captures(raw)?;
    ymd(&caps[3], month_number(&caps[2]), &caps[1])
}

/// Scrape both blocks of the TJ-MG news page.
///
/// The featured block is read first, then the chronological list. Every
/// item is checked against the window on its own; nothing stops the scan
/// early. A list item whose URL was already collected is dropped.
///
/// # Arguments
///
/// * `fetcher` - Page source
/// * `settings` - Window and summary limit
///
/// # Returns
///
/// Featured news followed by list news, each in page order.
///
/// # Errors
///
/// [`ScrapeError::Listing`] when the news page cannot be fetched.
#[instrument(level = "info", skip_all)]
pub async fn scrape<F: PageFetcher>(
    fetcher: &F,
    settings: &CrawlSettings,
) -> Result<Vec<NewsItem>, ScrapeError> {
    let base = parse_url(BASE_URL)?;
    let html = fetcher.fetch(LISTING_URL).await?;
    let document = Html::parse_document(&html);

    let featured_sel = selector(".featured-items")?;
    let featured_link_sel = selector("a.card")?;
    let featured_title_sel = selector(".card-title")?;
    let featured_summary_sel = selector(r#"p[data-home-paragraph="true"]"#)?;
    let clock_sel = selector(".clock")?;

    let list_sel = selector(".article-list-horizontal .list-news")?;
    let subheading_sel = selector("p.subheading")?;
    let article_sel = selector("article.card")?;
    let list_link_sel = selector(".card-title a")?;
    let list_summary_sel = selector("p.paragraph a")?;

    let resolve = |href: Option<&str>| {
        href.filter(|h| !h.is_empty())
            .and_then(|h| base.join(h).ok())
            .map(|u| u.to_string())
    };
    let eligible =
        |title: &str, date: NaiveDate| !title.is_empty() && is_within_window(date, settings.window_days);

    let mut news: Vec<NewsItem> = Vec::new();

    for card in document.select(&featured_sel) {
        let url = resolve(select_href(card, &featured_link_sel));
        let date = parse_date(&select_text(card, &clock_sel));
        let (Some(url), Some(date)) = (url, date) else {
            continue;
        };
        let title = collapse_whitespace(&select_text(card, &featured_title_sel));
        if !eligible(&title, date) {
            continue;
        }
        let summary = normalize(
            &select_text(card, &featured_summary_sel),
            settings.body_char_limit,
        );
        news.push(NewsItem {
            date,
            url,
            title,
            summary,
        });
    }
    let featured = news.len();

    // Entries before the first subheading have no date and are skipped.
    let mut current_date: Option<NaiveDate> = None;
    for entry in document.select(&list_sel) {
        let subheading = select_text(entry, &subheading_sel);
        if !subheading.trim().is_empty() {
            current_date = parse_date(&subheading);
        }

        let Some(article) = entry.select(&article_sel).next() else {
            continue;
        };
        let url = resolve(select_href(article, &list_link_sel));
        let (Some(url), Some(date)) = (url, current_date) else {
            continue;
        };
        let title = collapse_whitespace(&select_text(article, &list_link_sel));
        if !eligible(&title, date) {
            continue;
        }
        if news.iter().any(|n| n.url == url) {
            debug!(%url, "Skipping duplicate TJ-MG entry");
            continue;
        }
        let summary = normalize(
            &select_text(article, &list_summary_sel),
            settings.body_char_limit,
        );
        news.push(NewsItem {
            date,
            url,
            title,
            summary,
        });
    }

    info!(
        featured,
        chronological = news.len() - featured,
        "Parsed TJ-MG listing"
    );
    Ok(news)
}
