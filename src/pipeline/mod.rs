//! Multi-country orchestrator: ties scraper → dataset → storage together.
//!
//! `run()` opens one browser session for the whole run and crawls every
//! configured country in order, strictly one page at a time. Per-country
//! results are concatenated, deduplicated on `(name, website)` keeping the
//! first occurrence, and written to the CSV dataset (and DuckDB when
//! enabled). The session is closed on every exit path; a failure to close
//! it is logged and otherwise ignored.

use crate::config::AppConfig;
use crate::models::AgencyRecord;
use crate::scraper::ClutchScraper;
use crate::scraper::browser::{BrowserSession, open_session};
use crate::storage::dataset::write_dataset;
use crate::storage::{Repository, RunStatus, RunSummary};
use anyhow::{Context, Result};
use std::collections::HashSet;
use tokio::time::sleep;
use tracing::{info, warn};

pub struct Pipeline {
    config: AppConfig,
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub countries: usize,
    pub pages_failed: usize,
    pub cards_failed: usize,
    pub agencies_scraped: usize,
    pub agencies_unique: usize,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<PipelineStats> {
        let mut session = open_session(&self.config.scraper)
            .context("Failed to start browser session")?;
        self.run_with_session(&mut *session).await
    }

    /// Full run against a caller-provided session. The session is released
    /// before this returns, whatever the outcome.
    pub async fn run_with_session<S>(&self, session: &mut S) -> Result<PipelineStats>
    where
        S: BrowserSession + ?Sized,
    {
        let outcome = self.crawl_and_persist(session).await;

        if let Err(e) = session.close().await {
            warn!("Ignoring error while closing browser session: {}", e);
        }

        outcome
    }

    async fn crawl_and_persist<S>(&self, session: &mut S) -> Result<PipelineStats>
    where
        S: BrowserSession + ?Sized,
    {
        let scraper = ClutchScraper::new(&self.config.scraper, &self.config.selectors)
            .context("Invalid selector configuration")?;

        let repo = if self.config.storage.write_db {
            let repo = Repository::open(&self.config.storage.db_path)
                .context("Failed to open DuckDB")?;
            if self.config.storage.run_migrations {
                repo.run_migrations()?;
            }
            Some(repo)
        } else {
            None
        };
        let run_id = repo.as_ref().and_then(|r| match r.begin_scrape_run() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Could not record scrape run start: {:#}", e);
                None
            }
        });

        let mut stats = PipelineStats::default();
        let mut combined = Vec::new();
        let countries = &self.config.countries;

        for (i, country) in countries.iter().enumerate() {
            info!("=== Scraping {} - {} ({}) ===", country.code, country.name, country.currency);

            let crawl = scraper.crawl_country(session, country).await;
            info!(
                "{}: {} agencies from {} cards",
                country.code,
                crawl.records.len(),
                crawl.cards_seen()
            );

            stats.countries += 1;
            stats.pages_failed += crawl.failed_pages();
            stats.cards_failed += crawl.cards_failed;
            combined.extend(crawl.records);

            if i + 1 < countries.len() {
                sleep(self.config.scraper.country_delay()).await;
            }
        }

        stats.agencies_scraped = combined.len();
        let unique = dedupe_first(combined);
        stats.agencies_unique = unique.len();

        let persisted = self.persist(&unique, repo.as_ref());

        if let (Some(repo), Some(run_id)) = (&repo, run_id) {
            let summary = RunSummary {
                countries: stats.countries,
                pages_failed: stats.pages_failed,
                agencies_found: stats.agencies_unique,
            };
            let (status, note) = match &persisted {
                Err(e) => (RunStatus::Failed, Some(format!("{:#}", e))),
                Ok(()) if stats.pages_failed > 0 => (
                    RunStatus::Partial,
                    Some(format!("{} failed pages", stats.pages_failed)),
                ),
                Ok(()) => (RunStatus::Success, None),
            };
            if let Err(e) = repo.finish_scrape_run(run_id, summary, status, note.as_deref()) {
                warn!("Could not record scrape run {} result: {:#}", run_id, e);
            }
        }
        persisted?;

        info!(
            "TOTAL: {} unique agencies ({} scraped, {} failed pages, {} failed cards)",
            stats.agencies_unique, stats.agencies_scraped, stats.pages_failed, stats.cards_failed
        );
        Ok(stats)
    }

    fn persist(&self, unique: &[AgencyRecord], repo: Option<&Repository>) -> Result<()> {
        write_dataset(&self.config.storage.output_csv, unique)?;
        if let Some(repo) = repo {
            repo.upsert_agencies(unique)?;
        }
        Ok(())
    }
}

/// Drop records whose `(name, website)` was already seen, keeping order.
pub fn dedupe_first(records: Vec<AgencyRecord>) -> Vec<AgencyRecord> {
    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.name.clone(), r.website.clone())))
        .collect()
}
