//! TJ-RJ news scraper.
//!
//! The listing carries no summaries, so every in-window item's article is
//! fetched afterwards, one at a time in listing order. There is a single
//! listing page and no ordering to rely on, so every row is filtered.

use super::{ScrapeError, find_dmy, parse_url, select_href, select_text, selector};
use crate::config::CrawlSettings;
use crate::fetch::PageFetcher;
use crate::models::NewsItem;
use crate::utils::{collapse_whitespace, is_within_window, normalize};
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

pub const BASE_URL: &str = "https://www.tjrj.jus.br";
pub const LISTING_URL: &str = "https://www.tjrj.jus.br/noticias";

fn parse_listing(html: &str, settings: &CrawlSettings) -> Result<Vec<NewsItem>, ScrapeError> {
    let base = parse_url(BASE_URL)?;
    let document = Html::parse_document(html);
    let row_sel = selector("ul.lista-noticias li")?;
    let date_sel = selector("span.data strong")?;
    let link_sel = selector("span.data a")?;

    let mut items = Vec::new();
    for row in document.select(&row_sel) {
        let url = select_href(row, &link_sel)
            .filter(|h| !h.is_empty())
            .and_then(|h| base.join(h).ok());
        let date = find_dmy(&select_text(row, &date_sel));
        let (Some(url), Some(date)) = (url, date) else {
            continue;
        };
        let title = collapse_whitespace(&select_text(row, &link_sel));
        if title.is_empty() || !is_within_window(date, settings.window_days) {
            continue;
        }
        items.push(NewsItem {
            date,
            url: url.to_string(),
            title,
            summary: String::new(),
        });
    }
    Ok(items)
}

fn extract_summary(html: &str, body_sel: &Selector, limit: usize) -> String {
    let document = Html::parse_document(html);
    let text = document
        .select(body_sel)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    normalize(&text, limit)
}

/// Scrape the TJ-RJ listing and fill in each item's summary.
///
/// Rows are filtered against the window first. Each surviving row then gets
/// one article fetch, in listing order. A failed article fetch leaves its
/// summary empty.
///
/// # Arguments
///
/// * `fetcher` - Page source
/// * `settings` - Window and summary limit
///
/// # Returns
///
/// In-window news in listing order.
///
/// # Errors
///
/// [`ScrapeError::Listing`] when the listing page cannot be fetched.
#[instrument(level = "info", skip_all)]
pub async fn scrape<F: PageFetcher>(
    fetcher: &F,
    settings: &CrawlSettings,
) -> Result<Vec<NewsItem>, ScrapeError> {
    let html = fetcher.fetch(LISTING_URL).await?;
    let listed = parse_listing(&html, settings)?;
    info!(count = listed.len(), "Indexed TJ-RJ news within window");

    let body_sel = selector(".journal-content-article p, .portlet-body p")?;
    let body_sel = &body_sel;
    let news = stream::iter(listed)
        .then(move |mut item| async move {
            match fetcher.fetch(&item.url).await {
                Ok(page) => {
                    item.summary = extract_summary(&page, body_sel, settings.body_char_limit);
                    debug!(url = %item.url, "Fetched TJ-RJ article");
                }
                Err(e) => {
                    warn!(url = %item.url, error = %e, "TJ-RJ article fetch failed; keeping empty summary");
                }
            }
            item
        })
        .collect::<Vec<_>>()
        .await;

    Ok(news)
}
