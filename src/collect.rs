//! Runs every court scraper and gathers the results.
//!
//! Courts run one after another in declared order. A court whose scraper
//! fails contributes nothing but a warning; the run always completes.
//! Item-level problems never reach this level, the scrapers absorb them.

use crate::config::CrawlSettings;
use crate::fetch::PageFetcher;
use crate::models::{CollectionOutcome, SourceResult};
use crate::scrapers::Court;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Sequential collector over a fixed list of courts.
#[derive(Debug)]
pub struct Collector<'a, F> {
    fetcher: &'a F,
    settings: &'a CrawlSettings,
    courts: Vec<Court>,
}

impl<'a, F: PageFetcher> Collector<'a, F> {
    /// Collector over every supported court.
    pub fn new(fetcher: &'a F, settings: &'a CrawlSettings) -> Self {
        Self::with_courts(fetcher, settings, Court::ALL.to_vec())
    }

    pub fn with_courts(fetcher: &'a F, settings: &'a CrawlSettings, courts: Vec<Court>) -> Self {
        Self {
            fetcher,
            settings,
            courts,
        }
    }

    /// Scrape every court once.
    #[instrument(level = "info", skip_all, fields(courts = self.courts.len()))]
    pub async fn collect_all(&self) -> CollectionOutcome {
        let mut outcome = CollectionOutcome::default();

        for court in &self.courts {
            let t0 = Instant::now();
            info!(court = court.id(), "Collecting court news");
            match court.scrape(self.fetcher, self.settings).await {
                Ok(news) => {
                    info!(
                        court = court.id(),
                        count = news.len(),
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "Collected court news"
                    );
                    outcome.results.push(SourceResult {
                        source: court.id().to_string(),
                        news,
                    });
                }
                Err(e) => {
                    let message = format!("Failed to collect data from {}: {}", court.id(), e);
                    warn!(court = court.id(), error = %e, "Court skipped");
                    outcome.warnings.push(message);
                }
            }
        }

        info!(
            succeeded = outcome.results.len(),
            failed = outcome.warnings.len(),
            "Collection finished"
        );
        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fetch::testing::{FakeFetcher, days_ago};
    use crate::scrapers::{tjmg, tjrj, tjsp};

    /// A fetcher where TJ-MG has one fresh item, TJ-RJ and TJ-SP are empty,
    /// and TJ-PR is unreachable.
    pub(crate) fn fetcher_with_tjpr_down() -> FakeFetcher {
        let tjmg_page = format!(
            r#"<div class="featured-items"><a class="card" href="/n/1.htm">
                 <span class="card-title">Manutenção programada</span>
                 <span class="clock">{}</span></a></div>"#,
            days_ago(0)
        );
        FakeFetcher::new()
            .with_page(tjmg::LISTING_URL, tjmg_page)
            .with_page(tjrj::LISTING_URL, "<ul class=\"lista-noticias\"></ul>")
            .with_page(&tjsp::page_url(1), "<html></html>")
    }

    #[tokio::test]
    async fn test_failing_court_becomes_single_warning() {
        let fetcher = fetcher_with_tjpr_down();
        let settings = CrawlSettings::default();
        let outcome = Collector::new(&fetcher, &settings).collect_all().await;

        let sources: Vec<_> = outcome.results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["TJ-MG", "TJ-RJ", "TJ-SP"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("Failed to collect data from TJ-PR: "));
        assert!(outcome.warnings[0].contains("HTTP 404"));
        assert_eq!(outcome.results[0].news.len(), 1);
        assert!(outcome.results[1].news.is_empty());
    }

    #[tokio::test]
    async fn test_courts_run_in_declared_order() {
        let fetcher = fetcher_with_tjpr_down();
        let settings = CrawlSettings::default();
        Collector::new(&fetcher, &settings).collect_all().await;

        let requested = fetcher.requested();
        let position = |url: &str| requested.iter().position(|u| u == url).unwrap();
        assert!(position(tjmg::LISTING_URL) < position(crate::scrapers::tjpr::LISTING_URL));
        assert!(position(crate::scrapers::tjpr::LISTING_URL) < position(tjrj::LISTING_URL));
        assert!(position(tjrj::LISTING_URL) < position(&tjsp::page_url(1)));
    }

    #[tokio::test]
    async fn test_all_courts_down_still_completes() {
        let fetcher = FakeFetcher::new();
        let settings = CrawlSettings::default();
        let outcome = Collector::new(&fetcher, &settings).collect_all().await;

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.warnings.len(), 4);
        assert!(outcome.warnings[3].contains("TJ-SP"));
    }

    #[tokio::test]
    async fn test_with_courts_limits_the_run() {
        let fetcher = fetcher_with_tjpr_down();
        let settings = CrawlSettings::default();
        let outcome = Collector::with_courts(&fetcher, &settings, vec![Court::TjRj])
            .collect_all()
            .await;

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].source, "TJ-RJ");
        assert!(outcome.warnings.is_empty());
        assert_eq!(fetcher.requested(), vec![tjrj::LISTING_URL]);
    }
}
