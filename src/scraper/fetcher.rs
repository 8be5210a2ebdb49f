use super::browser::BrowserSession;
use super::error::FetchError;
use super::parsers::ListingParser;
use crate::config::ScraperConfig;
use crate::models::CountryConfig;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// A loaded listing page.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedPage {
    /// A listing container appeared within the wait bound.
    Ready(String),
    /// The wait bound elapsed first; carries whatever document was present.
    ContainerMissing(String),
}

/// Listing URL: `{base}/{slug}/{category}`, with `?page=N` past the first page.
pub fn listing_url(base_url: &str, country: &CountryConfig, category: &str, page: u32) -> String {
    let base = base_url.trim_end_matches('/');
    let path = if country.slug.is_empty() {
        format!("{}/{}", base, category)
    } else {
        format!("{}/{}/{}", base, country.slug, category)
    };

    if page <= 1 {
        path
    } else {
        format!("{}?page={}", path, page)
    }
}

pub struct PageFetcher<'a> {
    config: &'a ScraperConfig,
    parser: &'a ListingParser,
}

impl<'a> PageFetcher<'a> {
    pub fn new(config: &'a ScraperConfig, parser: &'a ListingParser) -> Self {
        Self { config, parser }
    }

    /// Navigate, let the page settle, then poll until a listing container
    /// shows up or the container timeout elapses.
    ///
    /// Navigation errors are returned; a missing container is not an error.
    pub async fn fetch<S>(
        &self,
        session: &mut S,
        country: &CountryConfig,
        page: u32,
    ) -> Result<FetchedPage, FetchError>
    where
        S: BrowserSession + ?Sized,
    {
        let url = listing_url(&self.config.base_url, country, &self.config.category, page);
        session.navigate(&url).await?;

        if !session.renders_client_side() {
            let html = session.page_source().await?;
            return Ok(if self.parser.has_listing_container(&html) {
                FetchedPage::Ready(html)
            } else {
                FetchedPage::ContainerMissing(html)
            });
        }

        sleep(self.config.settle_delay()).await;

        let deadline = Instant::now() + self.config.container_timeout();
        loop {
            let html = session.page_source().await?;
            if self.parser.has_listing_container(&html) {
                return Ok(FetchedPage::Ready(html));
            }
            if Instant::now() >= deadline {
                debug!("Container wait timed out for {}", url);
                return Ok(FetchedPage::ContainerMissing(html));
            }
            sleep(self.config.container_poll()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::models::CountryCode;
    use async_trait::async_trait;

    #[test]
    fn test_listing_url() {
        let za = CountryConfig::new(CountryCode::Sa, "South Africa", "za", "ZAR");
        assert_eq!(
            listing_url("https://clutch.co/", &za, "web-developers", 1),
            "https://clutch.co/za/web-developers"
        );
        assert_eq!(
            listing_url("https://clutch.co", &za, "web-developers", 3),
            "https://clutch.co/za/web-developers?page=3"
        );

        let global = CountryConfig::new(CountryCode::Us, "United States", "", "USD");
        assert_eq!(
            listing_url("https://clutch.co", &global, "web-developers", 2),
            "https://clutch.co/web-developers?page=2"
        );
    }

    /// Renders client-side: the container appears after `hydrate_after` polls.
    struct HydratingSession {
        polls: u32,
        hydrate_after: u32,
        navigated: Vec<String>,
    }

    #[async_trait]
    impl BrowserSession for HydratingSession {
        async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
            self.navigated.push(url.to_string());
            self.polls = 0;
            Ok(())
        }

        async fn page_source(&mut self) -> Result<String, FetchError> {
            self.polls += 1;
            if self.polls > self.hydrate_after {
                Ok("<div class='listing'><div class='provider-row'><h3>A</h3></div></div>".into())
            } else {
                Ok("<div id='root'></div>".into())
            }
        }

        async fn close(&mut self) -> Result<(), FetchError> {
            Ok(())
        }
    }

    fn fast_config(container_timeout_secs: u64) -> ScraperConfig {
        ScraperConfig {
            settle_delay_ms: 0,
            container_poll_ms: 1,
            container_timeout_secs,
            ..ScraperConfig::default()
        }
    }

    #[test]
    fn test_waits_for_hydration() {
        tokio_test::block_on(async {
            let cfg = fast_config(5);
            let parser = ListingParser::from_config(&SelectorConfig::default()).unwrap();
            let fetcher = PageFetcher::new(&cfg, &parser);
            let us = CountryConfig::new(CountryCode::Us, "United States", "us", "USD");
            let mut session = HydratingSession { polls: 0, hydrate_after: 3, navigated: vec![] };

            let page = fetcher.fetch(&mut session, &us, 2).await.unwrap();
            assert!(matches!(page, FetchedPage::Ready(_)));
            assert_eq!(session.polls, 4);
            assert_eq!(session.navigated, vec!["https://clutch.co/us/web-developers?page=2"]);
        });
    }

    #[test]
    fn test_container_timeout_returns_document() {
        tokio_test::block_on(async {
            let cfg = fast_config(0);
            let parser = ListingParser::from_config(&SelectorConfig::default()).unwrap();
            let fetcher = PageFetcher::new(&cfg, &parser);
            let us = CountryConfig::new(CountryCode::Us, "United States", "us", "USD");
            let mut session = HydratingSession { polls: 0, hydrate_after: u32::MAX, navigated: vec![] };

            let page = fetcher.fetch(&mut session, &us, 1).await.unwrap();
            assert_eq!(page, FetchedPage::ContainerMissing("<div id='root'></div>".into()));
        });
    }
}
