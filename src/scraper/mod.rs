pub mod browser;
pub mod card;
#[cfg(feature = "headless")]
pub mod chrome;
pub mod cleaner;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod parsers;

use crate::config::{ScraperConfig, SelectorConfig};
use crate::models::{AgencyRecord, CountryConfig};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use self::browser::BrowserSession;
use self::error::SelectorError;
use self::fetcher::{FetchedPage, PageFetcher};
use self::parsers::ListingParser;

// ── Per-country crawl ─────────────────────────────────────────────────────────

/// What happened on one page of a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Scraped { cards: usize },
    ContainerMissing,
    NoCards,
    FetchFailed,
}

#[derive(Debug, Default)]
pub struct CountryCrawl {
    pub records: Vec<AgencyRecord>,
    pub pages: Vec<PageStatus>,
    pub cards_failed: usize,
}

impl CountryCrawl {
    pub fn cards_seen(&self) -> usize {
        self.pages
            .iter()
            .map(|p| match p {
                PageStatus::Scraped { cards } => *cards,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p, PageStatus::FetchFailed))
            .count()
    }
}

/// Walks the listing pages of one country, one page at a time.
pub struct ClutchScraper {
    config: ScraperConfig,
    parser: ListingParser,
}

impl ClutchScraper {
    pub fn new(config: &ScraperConfig, selectors: &SelectorConfig) -> Result<Self, SelectorError> {
        Ok(Self {
            config: config.clone(),
            parser: ListingParser::from_config(selectors)?,
        })
    }

    /// Crawl pages `1..=max_pages` for `country`. Never fails: bad pages are
    /// logged, backed off from, and skipped.
    pub async fn crawl_country<S>(&self, session: &mut S, country: &CountryConfig) -> CountryCrawl
    where
        S: BrowserSession + ?Sized,
    {
        let fetcher = PageFetcher::new(&self.config, &self.parser);
        let mut crawl = CountryCrawl::default();

        for page in 1..=self.config.max_pages {
            info!(
                "Scraping {} - {} - Page {}",
                country.code, self.config.category, page
            );

            let status = match fetcher.fetch(session, country, page).await {
                Ok(FetchedPage::Ready(html)) => {
                    let extracted = self.parser.parse_listing_page(&html, country);
                    crawl.cards_failed += extracted.failed;

                    if extracted.card_selector.is_none() {
                        warn!(
                            "{} page {}: no agency cards found, page structure likely changed",
                            country.code, page
                        );
                        PageStatus::NoCards
                    } else {
                        info!(
                            "  Page {}: {} cards, {} agencies, {} without a name",
                            page,
                            extracted.cards_seen,
                            extracted.records.len(),
                            extracted.rejected
                        );
                        let status = PageStatus::Scraped { cards: extracted.cards_seen };
                        crawl.records.extend(extracted.records);
                        status
                    }
                }
                Ok(FetchedPage::ContainerMissing(html)) => {
                    warn!(
                        "{} page {}: listing container never appeared ({} bytes loaded), skipping",
                        country.code,
                        page,
                        html.len()
                    );
                    PageStatus::ContainerMissing
                }
                Err(e) => {
                    error!("{} page {} failed: {}", country.code, page, e);
                    PageStatus::FetchFailed
                }
            };
            crawl.pages.push(status);

            if page < self.config.max_pages {
                let pause = match status {
                    PageStatus::FetchFailed => self.config.backoff_delay(),
                    _ => self.polite_delay(),
                };
                sleep(pause).await;
            }
        }

        crawl
    }

    /// Configured inter-page delay plus random jitter.
    fn polite_delay(&self) -> Duration {
        let jitter = if self.config.jitter_ms == 0 {
            0
        } else {
            rand::random_range(0..=self.config.jitter_ms)
        };
        Duration::from_millis(self.config.page_delay_ms + jitter)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{ScriptedSession, listing};
    use super::*;
    use crate::models::CountryCode;

    fn quiet_config(max_pages: u32) -> ScraperConfig {
        ScraperConfig {
            max_pages,
            settle_delay_ms: 0,
            page_delay_ms: 0,
            jitter_ms: 0,
            backoff_delay_ms: 0,
            country_delay_ms: 0,
            container_timeout_secs: 0,
            ..ScraperConfig::default()
        }
    }

    fn us() -> CountryConfig {
        CountryConfig::new(CountryCode::Us, "United States", "us", "USD")
    }

    #[test]
    fn test_failed_page_does_not_abort_country() {
        tokio_test::block_on(async {
            let scraper = ClutchScraper::new(&quiet_config(3), &SelectorConfig::default()).unwrap();
            // page 2 is not scripted, so navigating to it fails
            let mut session = ScriptedSession::default()
                .with_page(
                    "https://clutch.co/us/web-developers",
                    &listing(&["<h3>One</h3>", "<h3>Two</h3>"]),
                )
                .with_page(
                    "https://clutch.co/us/web-developers?page=3",
                    &listing(&["<h3>Three</h3>"]),
                );

            let crawl = scraper.crawl_country(&mut session, &us()).await;

            let names: Vec<_> = crawl.records.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["One", "Two", "Three"]);
            assert_eq!(crawl.failed_pages(), 1);
            assert_eq!(crawl.pages[1], PageStatus::FetchFailed);
            assert_eq!(session.visited.len(), 3);
        });
    }

    #[test]
    fn test_unhydrated_and_cardless_pages_are_skipped() {
        tokio_test::block_on(async {
            let scraper = ClutchScraper::new(&quiet_config(3), &SelectorConfig::default()).unwrap();
            let mut session = ScriptedSession::default()
                .with_page(
                    "https://clutch.co/us/web-developers",
                    "<html><body>Checking your browser...</body></html>",
                )
                .with_page(
                    "https://clutch.co/us/web-developers?page=2",
                    "<div class=\"listing\"><p>redesigned</p></div>",
                )
                .with_page(
                    "https://clutch.co/us/web-developers?page=3",
                    &listing(&["<h3>Kept</h3>", "<span class=\"rating\">4.0</span>"]),
                );

            let crawl = scraper.crawl_country(&mut session, &us()).await;

            assert_eq!(
                crawl.pages,
                vec![
                    PageStatus::ContainerMissing,
                    PageStatus::NoCards,
                    PageStatus::Scraped { cards: 2 },
                ]
            );
            assert_eq!(crawl.cards_seen(), 2);
            assert_eq!(crawl.records.len(), 1);
            assert_eq!(crawl.records[0].name, "Kept");
        });
    }

    #[test]
    fn test_failed_page_gets_backoff_instead_of_polite_delay() {
        tokio_test::block_on(async {
            tokio::time::pause();
            let cfg = ScraperConfig {
                page_delay_ms: 100,
                backoff_delay_ms: 10_000,
                ..quiet_config(3)
            };
            let scraper = ClutchScraper::new(&cfg, &SelectorConfig::default()).unwrap();
            let mut session = ScriptedSession::default()
                .with_page("https://clutch.co/us/web-developers", &listing(&["<h3>One</h3>"]))
                .with_page(
                    "https://clutch.co/us/web-developers?page=3",
                    &listing(&["<h3>Three</h3>"]),
                );

            let started = tokio::time::Instant::now();
            let crawl = scraper.crawl_country(&mut session, &us()).await;
            let elapsed = started.elapsed();

            // 100ms after page 1, 10s backoff after page 2, nothing after page 3.
            assert_eq!(crawl.records.len(), 2);
            assert!(elapsed >= Duration::from_millis(10_100), "{elapsed:?}");
            assert!(elapsed < Duration::from_millis(10_200), "{elapsed:?}");
        });
    }

    #[test]
    fn test_polite_delay_stays_within_jitter() {
        let cfg = ScraperConfig {
            page_delay_ms: 100,
            jitter_ms: 50,
            ..ScraperConfig::default()
        };
        let scraper = ClutchScraper::new(&cfg, &SelectorConfig::default()).unwrap();
        for _ in 0..20 {
            let d = scraper.polite_delay().as_millis();
            assert!((100..=150).contains(&d));
        }
    }
}
