//! TJ-SP news scraper.
//!
//! Listing pages are addressed as `?pagina=N` and walked until one yields no
//! article links. Links carry no structured date, so the date is searched
//! in the link's text and then in a few enclosing elements. The same anchor
//! often appears twice per card; duplicates are dropped within a page.
//!
//! Once an out-of-window item is seen the current page is still finished,
//! but no further page is requested.

use super::{DMY, ScrapeError, parse_url, selector, ymd};
use crate::config::CrawlSettings;
use crate::fetch::PageFetcher;
use crate::models::NewsItem;
use crate::utils::{collapse_whitespace, is_within_window, normalize};
use chrono::NaiveDate;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, instrument, warn};
use url::Url;

pub const BASE_URL: &str = "https://www.tjsp.jus.br";
pub const LISTING_URL: &str = "https://www.tjsp.jus.br/Noticias";

pub const TITLE_NOT_FOUND: &str = "Title not found";
pub const DETAIL_ERROR_TITLE: &str = "Error";
pub const DETAIL_ERROR_SUMMARY: &str = "Could not extract content";

/// The link itself plus up to three enclosing elements.
const DATE_SEARCH_DEPTH: usize = 4;

struct Selectors {
    link: Selector,
    title: Selector,
    body: Selector,
}

impl Selectors {
    fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            link: selector("a[href*='codigoNoticia=']")?,
            title: selector("h3, .titulo-noticia")?,
            body: selector("article p, .noticia p, .conteudo p")?,
        })
    }
}

#[derive(Debug)]
struct Candidate {
    href: String,
    date: Option<NaiveDate>,
}

/// Address of a listing page.
///
/// # Arguments
///
/// * `page` - 1-based page number
///
/// # Returns
///
/// `{LISTING_URL}?pagina={page}`
///
/// # Examples
///
/// ```ignore
/// assert_eq!(page_url(2), "https://www.tjsp.jus.br/Noticias?pagina=2");
/// ```
pub fn page_url(page: usize) -> String {
    format!("{LISTING_URL}?pagina={page}")
}

/// The first real `dd/mm/yyyy` day found walking outward from `link`.
///
/// Impossible dates such as 31/02 are skipped and the search goes on.
fn nearby_date(link: ElementRef<'_>) -> Option<NaiveDate> {
    let mut current = Some(link);
    for _ in 0..DATE_SEARCH_DEPTH {
        let el = current?;
        let text: String = el.text().collect();
        let found = DMY
            .captures_iter(&text)
            .find_map(|caps| ymd(&caps[3], &caps[2], &caps[1]));
        if found.is_some() {
            return found;
        }
        current = el.parent().and_then(ElementRef::wrap);
    }
    None
}

fn parse_listing(html: &str, sel: &Selectors) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    document
        .select(&sel.link)
        .filter_map(|link| Some((link.value().attr("href")?, link)))
        .unique_by(|(href, _)| *href)
        .map(|(href, link)| Candidate {
            href: href.to_string(),
            date: nearby_date(link),
        })
        .collect()
}

fn extract_article(html: &str, sel: &Selectors, limit: usize) -> (String, String) {
    let document = Html::parse_document(html);
    let title = document
        .select(&sel.title)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| TITLE_NOT_FOUND.to_string());
    let body = document
        .select(&sel.body)
        .map(|p| p.text().collect::<String>())
        .join(" ");
    (title, normalize(&body, limit))
}

#[instrument(level = "debug", skip(fetcher, sel))]
async fn fetch_article<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    sel: &Selectors,
    limit: usize,
) -> (String, String) {
    match fetcher.fetch(url).await {
        Ok(html) => extract_article(&html, sel, limit),
        Err(e) => {
            warn!(%url, error = %e, "TJ-SP article fetch failed; using sentinel title and summary");
            (
                DETAIL_ERROR_TITLE.to_string(),
                DETAIL_ERROR_SUMMARY.to_string(),
            )
        }
    }
}

/// Walk TJ-SP listing pages until an out-of-window item or an empty page.
///
/// Each in-window link costs one article fetch, which supplies the title
/// and summary. A failed article fetch keeps the item with the
/// [`DETAIL_ERROR_TITLE`]/[`DETAIL_ERROR_SUMMARY`] pair.
///
/// # Arguments
///
/// * `fetcher` - Page source
/// * `settings` - Window, summary limit and page bound
///
/// # Returns
///
/// News in listing order. Links are resolved against [`BASE_URL`].
///
/// # Errors
///
/// [`ScrapeError::Listing`] when any listing page cannot be fetched.
#[instrument(level = "info", skip_all)]
pub async fn scrape<F: PageFetcher>(
    fetcher: &F,
    settings: &CrawlSettings,
) -> Result<Vec<NewsItem>, ScrapeError> {
    let sel = Selectors::new()?;
    let base: Url = parse_url(BASE_URL)?;
    let mut news = Vec::new();
    let mut page = 1usize;
    let mut keep_paging = true;

    while keep_paging {
        if page > settings.max_pages {
            warn!(max_pages = settings.max_pages, "TJ-SP page bound reached");
            break;
        }
        let html = fetcher.fetch(&page_url(page)).await?;
        let candidates = parse_listing(&html, &sel);
        info!(page, links = candidates.len(), "Parsed TJ-SP listing page");
        if candidates.is_empty() {
            break;
        }

        for candidate in candidates {
            let Some(date) = candidate.date else {
                continue;
            };
            if !is_within_window(date, settings.window_days) {
                if keep_paging {
                    info!(page, %date, "Reached TJ-SP news older than the window");
                }
                keep_paging = false;
                continue;
            }
            let url = match base.join(&candidate.href) {
                Ok(url) => url.to_string(),
                Err(e) => {
                    warn!(href = %candidate.href, error = %e, "Skipping unresolvable TJ-SP link");
                    continue;
                }
            };
            let (title, summary) = fetch_article(fetcher, &url, &sel, settings.body_char_limit).await;
            news.push(NewsItem {
                date,
                url,
                title,
                summary,
            });
        }

        page += 1;
    }

    Ok(news)
}
