//! Court portal scrapers.
//!
//! Each court exposes a different listing layout and a different way to
//! page through it, so each one gets its own module with a single
//! `scrape(fetcher, settings)` entry point returning [`NewsItem`]s.
//!
//! # Supported Sources
//!
//! | Court | Module | Pagination | Stops when | Detail page |
//! |-------|--------|------------|------------|-------------|
//! | TJ-MG | [`tjmg`] | none, two blocks merged | never, every item filtered | no |
//! | TJ-PR | [`tjpr`] | "next page" link | first old item, immediately | yes, sentinel on failure |
//! | TJ-RJ | [`tjrj`] | none | never, every item filtered | yes, empty summary on failure |
//! | TJ-SP | [`tjsp`] | `?pagina=N` | first old item, after the current page | yes, sentinel pair on failure |
//!
//! Failing to fetch a listing page fails the whole court. Failing to fetch
//! an article page only degrades that item.

use crate::config::CrawlSettings;
use crate::fetch::{FetchError, PageFetcher};
use crate::models::NewsItem;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

pub mod tjmg;
pub mod tjpr;
pub mod tjrj;
pub mod tjsp;

/// A court could not be scraped at all.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("listing page unavailable: {0}")]
    Listing(#[from] FetchError),
    #[error("invalid URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid selector {0:?}")]
    Selector(&'static str),
}

/// The monitored courts, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Court {
    TjMg,
    TjPr,
    TjRj,
    TjSp,
}

impl Court {
    pub const ALL: [Court; 4] = [Court::TjMg, Court::TjPr, Court::TjRj, Court::TjSp];

    pub fn id(self) -> &'static str {
        match self {
            Court::TjMg => "TJ-MG",
            Court::TjPr => "TJ-PR",
            Court::TjRj => "TJ-RJ",
            Court::TjSp => "TJ-SP",
        }
    }

    /// Look a court up by its identifier, ignoring case.
    pub fn from_id(id: &str) -> Option<Court> {
        Court::ALL
            .into_iter()
            .find(|c| c.id().eq_ignore_ascii_case(id.trim()))
    }

    /// Run this court's scraper.
    #[instrument(level = "info", skip_all, fields(court = self.id()))]
    pub async fn scrape<F: PageFetcher>(
        self,
        fetcher: &F,
        settings: &CrawlSettings,
    ) -> Result<Vec<NewsItem>, ScrapeError> {
        let items = match self {
            Court::TjMg => tjmg::scrape(fetcher, settings).await?,
            Court::TjPr => tjpr::scrape(fetcher, settings).await?,
            Court::TjRj => tjrj::scrape(fetcher, settings).await?,
            Court::TjSp => tjsp::scrape(fetcher, settings).await?,
        };
        info!(count = items.len(), "Scraped court news");
        Ok(items)
    }
}

pub(crate) static DMY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2})/(\d{2})/(\d{4})").unwrap());

/// Parse a compiled-in CSS selector.
pub(crate) fn selector(css: &'static str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|_| ScrapeError::Selector(css))
}

pub(crate) fn parse_url(url: &str) -> Result<Url, ScrapeError> {
    Url::parse(url).map_err(|source| ScrapeError::Url {
        url: url.to_string(),
        source,
    })
}

/// Build a calendar day, rejecting impossible ones like 31/02.
pub(crate) fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// First `dd/mm/yyyy` in `text`, if it is a real day.
pub(crate) fn find_dmy(text: &str) -> Option<NaiveDate> {
    let caps = DMY.captures(text)?;
    ymd(&caps[3], &caps[2], &caps[1])
}

/// Concatenated text of every element under `root` matching `sel`.
pub(crate) fn select_text(root: ElementRef<'_>, sel: &Selector) -> String {
    root.select(sel).flat_map(|el| el.text()).collect()
}

/// `href` of the first element under `root` matching `sel`.
pub(crate) fn select_href<'a>(root: ElementRef<'a>, sel: &Selector) -> Option<&'a str> {
    root.select(sel).next()?.value().attr("href")
}

const INVISIBLE: [&str; 4] = ["script", "style", "noscript", "iframe"];

/// Text under `el`, skipping anything inside script, style, noscript or iframe.
pub(crate) fn visible_text(el: ElementRef<'_>) -> String {
    el.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| INVISIBLE.contains(&a.value().name()));
            (!hidden).then_some(&**text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_court_order_and_ids() {
        let ids: Vec<_> = Court::ALL.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["TJ-MG", "TJ-PR", "TJ-RJ", "TJ-SP"]);
    }

    #[test]
    fn test_court_from_id() {
        assert_eq!(Court::from_id("tj-sp"), Some(Court::TjSp));
        assert_eq!(Court::from_id(" TJ-MG "), Some(Court::TjMg));
        assert_eq!(Court::from_id("TJ-BA"), None);
    }

    #[test]
    fn test_find_dmy() {
        assert_eq!(
            find_dmy("Publicado em 16/02/2026 às 10h"),
            NaiveDate::from_ymd_opt(2026, 2, 16)
        );
        assert_eq!(find_dmy("31/02/2026"), None);
        assert_eq!(find_dmy("sem data"), None);
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let doc = Html::parse_document(
            "<div id=c>Olá <script>var x = 1;</script><style>p{}</style>mundo<noscript>js</noscript></div>",
        );
        let sel = selector("#c").unwrap();
        let el = doc.select(&sel).next().unwrap();
        assert_eq!(visible_text(el), "Olá mundo");
    }

    #[test]
    fn test_select_text_concatenates_matches() {
        let doc = Html::parse_document("<div><span>a</span><span>b</span></div>");
        let sel = selector("span").unwrap();
        assert_eq!(select_text(doc.root_element(), &sel), "ab");
    }

    #[test]
    fn test_bad_selector_is_error() {
        assert!(matches!(selector("a[["), Err(ScrapeError::Selector(_))));
    }
}
