//! TJ-PR news scraper.
//!
//! The listing is reverse-chronological and paginated through a "next page"
//! link. Every card's article is fetched for its body. The first card older
//! than the window ends the crawl on the spot: no further cards on that
//! page, no further pages.

use super::{ScrapeError, parse_url, selector, visible_text, ymd};
use crate::config::CrawlSettings;
use crate::fetch::PageFetcher;
use crate::models::NewsItem;
use crate::utils::{collapse_whitespace, is_within_window, normalize};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, instrument, warn};
use url::Url;

pub const LISTING_URL: &str = "https://www.tjpr.jus.br/noticias";

/// Article page fetched, but no body text found.
pub const CONTENT_NOT_FOUND: &str = "Content not found.";
/// Article page could not be fetched.
pub const DETAIL_FETCH_FAILED: &str = "Error requesting internal news page.";

// The listing prints two-digit years; four-digit ones are taken as-is.
static CARD_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2})/(\d{2})/(\d{4}|\d{2})").unwrap());

#[derive(Debug)]
struct Card {
    title: String,
    /// Full article URL, query string included.
    href: String,
    date: NaiveDate,
}

#[derive(Debug)]
struct ListingPage {
    has_cards: bool,
    cards: Vec<Card>,
    next: Option<String>,
}

struct Selectors {
    card: Selector,
    title: Selector,
    date: Selector,
    next: Selector,
    body: Selector,
    fallback: Selector,
}

impl Selectors {
    fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            card: selector(".asset-abstract")?,
            title: selector("a.asset-title")?,
            date: selector(".date-info")?,
            next: selector(r#"a[title="Próxima página"]"#)?,
            body: selector(".journal-content-article p, .asset-content p")?,
            fallback: selector(".asset-content")?,
        })
    }
}

fn parse_card_date(text: &str) -> Option<NaiveDate> {
    let caps = CARD_DATE.captures(text)?;
    let year = &caps[3];
    let year = if year.len() == 2 {
        format!("20{year}")
    } else {
        year.to_string()
    };
    ymd(&year, &caps[2], &caps[1])
}

fn without_query(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

/// Parse one listing page.
///
/// # Arguments
///
/// * `html` - The listing page body
/// * `page_url` - Address the page was fetched from; relative links resolve against it
/// * `sel` - Compiled selectors
///
/// # Returns
///
/// The datable cards in listing order and the next page address. `next` is
/// `None` when the pager link is missing, disabled, empty, or points back at
/// `page_url`.
fn parse_listing(html: &str, page_url: &Url, sel: &Selectors) -> ListingPage {
    let document = Html::parse_document(html);
    let mut has_cards = false;
    let mut cards = Vec::new();

    for card in document.select(&sel.card) {
        has_cards = true;
        let (Some(title_el), Some(date_el)) = (
            card.select(&sel.title).next(),
            card.select(&sel.date).next(),
        ) else {
            continue;
        };
        let Some(href) = title_el
            .value()
            .attr("href")
            .and_then(|href| page_url.join(href).ok())
        else {
            continue;
        };
        let Some(date) = parse_card_date(&date_el.text().collect::<String>()) else {
            continue;
        };
        cards.push(Card {
            title: collapse_whitespace(&title_el.text().collect::<String>()),
            href: href.to_string(),
            date,
        });
    }

    let next = document
        .select(&sel.next)
        .next()
        .filter(|link| !in_disabled_item(*link))
        .and_then(|link| link.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .and_then(|href| page_url.join(href).ok())
        .filter(|next| next != page_url)
        .map(|u| u.to_string());

    ListingPage {
        has_cards,
        cards,
        next,
    }
}

fn in_disabled_item(link: ElementRef<'_>) -> bool {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "li")
        .is_some_and(|li| li.value().classes().any(|c| c == "disabled"))
}

fn extract_summary(html: &str, sel: &Selectors, limit: usize) -> String {
    let document = Html::parse_document(html);
    let paragraphs: Vec<String> = document.select(&sel.body).map(visible_text).collect();
    if !paragraphs.is_empty() {
        return normalize(&paragraphs.join(" "), limit);
    }
    let fallback: String = document.select(&sel.fallback).map(visible_text).collect();
    let fallback = normalize(&fallback, limit);
    if fallback.is_empty() {
        CONTENT_NOT_FOUND.to_string()
    } else {
        fallback
    }
}

#[instrument(level = "debug", skip(fetcher, sel))]
async fn fetch_summary<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    sel: &Selectors,
    limit: usize,
) -> String {
    match fetcher.fetch(url).await {
        Ok(html) => extract_summary(&html, sel, limit),
        Err(e) => {
            warn!(%url, error = %e, "TJ-PR article fetch failed; using sentinel summary");
            DETAIL_FETCH_FAILED.to_string()
        }
    }
}

/// Walk TJ-PR listing pages until an out-of-window card or the last page.
///
/// Every in-window card costs one article fetch. A failed article fetch keeps
/// the card with [`DETAIL_FETCH_FAILED`] as its summary; a failed listing
/// fetch, on any page, fails the whole court.
///
/// # Arguments
///
/// * `fetcher` - Page source
/// * `settings` - Window, summary limit and page bound
///
/// # Returns
///
/// News in listing order, with query strings stripped from their URLs.
///
/// # Errors
///
/// [`ScrapeError::Listing`] when a listing page cannot be fetched.
#[instrument(level = "info", skip_all)]
pub async fn scrape<F: PageFetcher>(
    fetcher: &F,
    settings: &CrawlSettings,
) -> Result<Vec<NewsItem>, ScrapeError> {
    let sel = Selectors::new()?;
    let mut news = Vec::new();
    let mut next_url = Some(LISTING_URL.to_string());
    let mut pages = 0usize;

    'pages: while let Some(page_url) = next_url.take() {
        if pages >= settings.max_pages {
            warn!(max_pages = settings.max_pages, "TJ-PR page bound reached");
            break;
        }
        pages += 1;

        let html = fetcher.fetch(&page_url).await?;
        let page = parse_listing(&html, &parse_url(&page_url)?, &sel);
        info!(page = pages, cards = page.cards.len(), "Parsed TJ-PR listing page");
        if !page.has_cards {
            break;
        }

        for card in page.cards {
            if !is_within_window(card.date, settings.window_days) {
                info!(date = %card.date, "Reached TJ-PR news older than the window");
                break 'pages;
            }
            let summary = fetch_summary(fetcher, &card.href, &sel, settings.body_char_limit).await;
            news.push(NewsItem {
                date: card.date,
                url: without_query(&card.href),
                title: card.title,
                summary,
            });
        }

        next_url = page.next;
    }

    Ok(news)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{FakeFetcher, days_ago};

    fn short_date(days: u64) -> String {
        let full = days_ago(days);
        format!("{}{}", &full[..6], &full[8..])
    }

    fn card(slug: &str, title: &str, date: &str) -> String {
        format!(
            r#"<div class="asset-abstract">
                 <h3><a class="asset-title" href="/noticias/-/asset_publisher/{slug}?redirect=x">{title}</a></h3>
                 <span class="date-info">Publicado em {date} às 10h</span>
               </div>"#
        )
    }

    fn listing(cards: &[String], next: Option<&str>, disabled: bool) -> String {
        let pager = match next {
            Some(href) => format!(
                r#"<ul><li class="{}"><a title="Próxima página" href="{href}">»</a></li></ul>"#,
                if disabled { "disabled" } else { "" }
            ),
            None => String::new(),
        };
        format!("<html><body>{}{pager}</body></html>", cards.concat())
    }

    fn article(body: &str) -> String {
        format!(r#"<html><body><div class="journal-content-article">{body}</div></body></html>"#)
    }

    fn detail_url(slug: &str) -> String {
        format!("https://www.tjpr.jus.br/noticias/-/asset_publisher/{slug}?redirect=x")
    }

    fn settings() -> CrawlSettings {
        CrawlSettings {
            window_days: 7,
            body_char_limit: 40,
            max_pages: 50,
        }
    }

    const PAGE_2: &str = "https://www.tjpr.jus.br/noticias?p=2";
    const PAGE_3: &str = "https://www.tjpr.jus.br/noticias?p=3";

    #[test]
    fn test_parse_card_date() {
        assert_eq!(parse_card_date("13/02/26"), NaiveDate::from_ymd_opt(2026, 2, 13));
        assert_eq!(parse_card_date("13/02/2026"), NaiveDate::from_ymd_opt(2026, 2, 13));
        assert_eq!(parse_card_date("sem data"), None);
    }

    #[tokio::test]
    async fn test_stops_at_first_old_card_without_fetching_more_pages() {
        let page1 = listing(
            &[card("a", "A", &short_date(0)), card("b", "B", &short_date(1))],
            Some(PAGE_2),
            false,
        );
        let page2 = listing(
            &[
                card("c", "C", &short_date(2)),
                card("d", "D", &short_date(9)),
                card("e", "E", &short_date(2)),
            ],
            Some(PAGE_3),
            false,
        );
        let page3 = listing(&[card("f", "F", &short_date(3))], None, false);
        let mut fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page1)
            .with_page(PAGE_2, page2)
            .with_page(PAGE_3, page3);
        for slug in ["a", "b", "c", "d", "e", "f"] {
            fetcher = fetcher.with_page(&detail_url(slug), article("<p>Corpo</p>"));
        }

        let news = scrape(&fetcher, &settings()).await.unwrap();

        let titles: Vec<_> = news.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert!(!fetcher.was_requested(PAGE_3));
        assert!(!fetcher.was_requested(&detail_url("d")));
        assert!(!fetcher.was_requested(&detail_url("e")));
    }

    #[tokio::test]
    async fn test_url_drops_query_and_summary_is_normalized() {
        let page = listing(&[card("a", "  Nova  resolução ", &short_date(0))], None, false);
        let body = "<p>Primeiro   parágrafo.</p><p>Segundo parágrafo, bem mais longo que o limite.</p>";
        let fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page)
            .with_page(&detail_url("a"), article(body));

        let news = scrape(&fetcher, &settings()).await.unwrap();

        assert_eq!(news.len(), 1);
        assert_eq!(news[0].url, "https://www.tjpr.jus.br/noticias/-/asset_publisher/a");
        assert_eq!(news[0].title, "Nova resolução");
        assert_eq!(
            news[0].summary,
            "Primeiro parágrafo. Segundo parágrafo, b..."
        );
        assert!(fetcher.was_requested(&detail_url("a")));
    }

    #[tokio::test]
    async fn test_detail_failures_keep_item_with_sentinel() {
        let page = listing(
            &[card("a", "A", &short_date(0)), card("b", "B", &short_date(0))],
            None,
            false,
        );
        let fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page)
            .with_page(&detail_url("b"), "<html><body><p>fora</p></body></html>");

        let news = scrape(&fetcher, &settings()).await.unwrap();

        assert_eq!(news.len(), 2);
        assert_eq!(news[0].summary, DETAIL_FETCH_FAILED);
        assert_eq!(news[1].summary, CONTENT_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fallback_body_ignores_scripts() {
        let page = listing(&[card("a", "A", &short_date(0))], None, false);
        let detail = r#"<html><body><div class="asset-content">Texto <script>track()</script>livre</div></body></html>"#;
        let fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page)
            .with_page(&detail_url("a"), detail);

        let news = scrape(&fetcher, &settings()).await.unwrap();
        assert_eq!(news[0].summary, "Texto livre");
    }

    #[tokio::test]
    async fn test_disabled_next_link_ends_pagination() {
        let page1 = listing(&[card("a", "A", &short_date(0))], Some(PAGE_2), true);
        let fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page1)
            .with_page(&detail_url("a"), article("<p>x</p>"));

        let news = scrape(&fetcher, &settings()).await.unwrap();
        assert_eq!(news.len(), 1);
        assert!(!fetcher.was_requested(PAGE_2));
    }

    #[tokio::test]
    async fn test_page_bound_stops_crawl() {
        let page1 = listing(&[card("a", "A", &short_date(0))], Some(PAGE_2), false);
        let fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page1)
            .with_page(&detail_url("a"), article("<p>x</p>"));
        let settings = CrawlSettings {
            max_pages: 1,
            ..settings()
        };

        let news = scrape(&fetcher, &settings).await.unwrap();
        assert_eq!(news.len(), 1);
        assert!(!fetcher.was_requested(PAGE_2));
    }

    #[tokio::test]
    async fn test_empty_next_link_ends_pagination() {
        let page1 = listing(&[card("a", "A", &short_date(0))], Some(""), false);
        let fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page1)
            .with_page(&detail_url("a"), article("<p>x</p>"));

        let news = scrape(&fetcher, &settings()).await.unwrap();

        assert_eq!(news.len(), 1);
        let listing_fetches = fetcher.requested().iter().filter(|u| *u == LISTING_URL).count();
        assert_eq!(listing_fetches, 1);
    }

    #[tokio::test]
    async fn test_next_link_to_same_page_ends_pagination() {
        let page1 = listing(&[card("a", "A", &short_date(0))], Some("/noticias"), false);
        let fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page1)
            .with_page(&detail_url("a"), article("<p>x</p>"));

        let news = scrape(&fetcher, &settings()).await.unwrap();

        assert_eq!(news.len(), 1);
        assert_eq!(fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_relative_card_link_resolves_against_listing() {
        let page = listing(&[], None, false).replace(
            "<body>",
            &format!(
                r#"<body><div class="asset-abstract">
                     <a class="asset-title" href="noticias/-/asset_publisher/r?x=1">R</a>
                     <span class="date-info">{}</span></div>"#,
                short_date(0)
            ),
        );
        let detail = "https://www.tjpr.jus.br/noticias/-/asset_publisher/r?x=1";
        let fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page)
            .with_page(detail, article("<p>x</p>"));

        let news = scrape(&fetcher, &settings()).await.unwrap();

        assert_eq!(news[0].url, "https://www.tjpr.jus.br/noticias/-/asset_publisher/r");
        assert!(fetcher.was_requested(detail));
    }

    #[tokio::test]
    async fn test_later_listing_failure_fails_court() {
        let page1 = listing(&[card("a", "A", &short_date(0))], Some(PAGE_2), false);
        let fetcher = FakeFetcher::new()
            .with_page(LISTING_URL, page1)
            .with_page(&detail_url("a"), article("<p>x</p>"));

        let err = scrape(&fetcher, &settings()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Listing(_)));
    }
}
