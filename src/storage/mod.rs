pub mod dataset;

use crate::models::{AgencyRecord, SERVICES_SEPARATOR};
use anyhow::{Context, Result};
use chrono::Utc;
use duckdb::{Connection, params};
use std::path::Path;
use tracing::info;

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS agencies (
    name                  VARCHAR  NOT NULL,
    -- '' when the listing had no external link
    website               VARCHAR  NOT NULL DEFAULT '',
    country               VARCHAR  NOT NULL,
    source                VARCHAR  NOT NULL,
    location_city         VARCHAR  NOT NULL,
    clutch_rating         DOUBLE   NOT NULL DEFAULT 0,
    min_project_size_usd  UBIGINT  NOT NULL DEFAULT 0,
    employees             INTEGER  NOT NULL,
    services              VARCHAR  NOT NULL DEFAULT '',
    is_wp_specialist      BOOLEAN  NOT NULL DEFAULT false,
    scraped_at            TIMESTAMP NOT NULL,
    PRIMARY KEY (name, website)
);

CREATE SEQUENCE IF NOT EXISTS scrape_run_ids START 1;

CREATE TABLE IF NOT EXISTS scrape_runs (
    id                  INTEGER PRIMARY KEY DEFAULT nextval('scrape_run_ids'),
    started_at          TIMESTAMP NOT NULL,
    finished_at         TIMESTAMP,
    status              VARCHAR NOT NULL DEFAULT 'running',
    countries           INTEGER DEFAULT 0,
    pages_failed        INTEGER DEFAULT 0,
    agencies_found      INTEGER DEFAULT 0,
    error_msg           VARCHAR
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

// ── Repository ────────────────────────────────────────────────────────────────

pub struct Repository {
    conn: Connection,
}

/// Counters recorded when a scrape run finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub countries: usize,
    pub pages_failed: usize,
    pub agencies_found: usize,
}

/// Final state of a scrape run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Finished, but some pages could not be fetched.
    Partial,
    /// Crawled, but the results could not be persisted.
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    // ── Agencies ──────────────────────────────────────────────────────────────

    /// Upsert agencies keyed on (name, website). Later scrapes refresh the
    /// stored fields.
    pub fn upsert_agencies(&self, agencies: &[AgencyRecord]) -> Result<usize> {
        if agencies.is_empty() { return Ok(0); }

        let now = Utc::now().naive_utc();
        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT INTO agencies
                (name, website, country, source, location_city, clutch_rating,
                 min_project_size_usd, employees, services, is_wp_specialist, scraped_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (name, website) DO UPDATE SET
                country              = excluded.country,
                source               = excluded.source,
                location_city        = excluded.location_city,
                clutch_rating        = excluded.clutch_rating,
                min_project_size_usd = excluded.min_project_size_usd,
                employees            = excluded.employees,
                services             = excluded.services,
                is_wp_specialist     = excluded.is_wp_specialist,
                scraped_at           = excluded.scraped_at
        "#;

        for a in agencies {
            tx.execute(sql, params![
                a.name,
                a.website.clone().unwrap_or_default(),
                a.country.as_str(),
                a.source,
                a.location_city,
                a.clutch_rating,
                a.min_project_size_usd,
                a.employees,
                a.services.join(SERVICES_SEPARATOR),
                a.is_wp_specialist,
                now,
            ]).with_context(|| format!("upsert agency {}", a.name))?;
        }

        tx.commit()?;
        Ok(agencies.len())
    }

    pub fn agency_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM agencies")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn wp_specialist_count(&self) -> Result<i64> {
        let mut s = self
            .conn
            .prepare("SELECT COUNT(*) FROM agencies WHERE is_wp_specialist")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    /// (country, agencies) ordered by country code.
    pub fn counts_by_country(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT country, COUNT(*) FROM agencies GROUP BY country ORDER BY country",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // ── Scrape run log ────────────────────────────────────────────────────────

    pub fn begin_scrape_run(&self) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO scrape_runs (started_at, status) VALUES (?, 'running') RETURNING id",
            params![Utc::now().naive_utc()],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    pub fn finish_scrape_run(
        &self, run_id: i64, summary: RunSummary, status: RunStatus, note: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            r#"UPDATE scrape_runs SET
               finished_at = ?, status = ?,
               countries = ?, pages_failed = ?, agencies_found = ?, error_msg = ?
               WHERE id = ?"#,
            params![
                Utc::now().naive_utc(),
                status.as_str(),
                summary.countries as i64,
                summary.pages_failed as i64,
                summary.agencies_found as i64,
                note,
                run_id,
            ],
        )?;
        Ok(())
    }

    /// Status and agency count of the most recent run.
    pub fn last_run(&self) -> Result<Option<(String, i64)>> {
        let mut s = self.conn.prepare(
            "SELECT status, agencies_found FROM scrape_runs ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = s.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        Ok(rows.next().transpose()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CountryCode;

    fn agency(name: &str, website: Option<&str>, country: CountryCode, wp: bool) -> AgencyRecord {
        AgencyRecord {
            country,
            source: "clutch.co".into(),
            name: name.into(),
            website: website.map(str::to_string),
            location_city: "London".into(),
            clutch_rating: 4.5,
            min_project_size_usd: 1_000,
            employees: 5,
            services: if wp { vec!["WordPress".into()] } else { vec![] },
            is_wp_specialist: wp,
        }
    }

    fn repo() -> Repository {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();
        repo
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let repo = repo();
        let batch = vec![
            agency("Acme", Some("https://acme.example"), CountryCode::Uk, true),
            agency("Acme", None, CountryCode::Uk, false),
        ];
        repo.upsert_agencies(&batch).unwrap();
        repo.upsert_agencies(&batch).unwrap();

        assert_eq!(repo.agency_count().unwrap(), 2);
        assert_eq!(repo.wp_specialist_count().unwrap(), 1);
    }

    #[test]
    fn test_counts_by_country() {
        let repo = repo();
        repo.upsert_agencies(&[
            agency("A", None, CountryCode::Us, false),
            agency("B", None, CountryCode::Us, false),
            agency("C", None, CountryCode::Au, false),
        ])
        .unwrap();

        assert_eq!(
            repo.counts_by_country().unwrap(),
            vec![("AU".to_string(), 1), ("US".to_string(), 2)]
        );
    }

    #[test]
    fn test_scrape_run_log() {
        let repo = repo();
        assert_eq!(repo.last_run().unwrap(), None);

        let first = repo.begin_scrape_run().unwrap();
        let second = repo.begin_scrape_run().unwrap();
        assert!(second > first);

        let summary = RunSummary { countries: 2, pages_failed: 1, agencies_found: 7 };
        repo.finish_scrape_run(second, summary, RunStatus::Partial, Some("1 failed pages")).unwrap();
        assert_eq!(repo.last_run().unwrap(), Some(("partial".to_string(), 7)));

        let third = repo.begin_scrape_run().unwrap();
        assert_eq!(repo.last_run().unwrap(), Some(("running".to_string(), 0)));
        repo.finish_scrape_run(third, summary, RunStatus::Failed, Some("disk full")).unwrap();
        assert_eq!(repo.last_run().unwrap(), Some(("failed".to_string(), 7)));
    }
}
