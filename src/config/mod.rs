use crate::models::{CountryCode, CountryConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default = "default_countries")]
    pub countries: Vec<CountryConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

/// Which `BrowserSession` drives the crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEngine {
    /// Plain GET of the server-rendered HTML.
    #[default]
    Http,
    /// Headless Chrome; needs the `headless` build feature.
    Chrome,
}

/// Scraper configuration. Delays are in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default)]
    pub engine: SessionEngine,

    /// Chrome only: run without a visible window.
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_container_timeout_secs")]
    pub container_timeout_secs: u64,

    #[serde(default = "default_container_poll_ms")]
    pub container_poll_ms: u64,

    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_backoff_delay_ms")]
    pub backoff_delay_ms: u64,

    #[serde(default = "default_country_delay_ms")]
    pub country_delay_ms: u64,
}

/// Ordered selector fallback lists. Earlier entries win.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectorConfig {
    #[serde(default = "default_container_selectors")]
    pub container: Vec<String>,
    #[serde(default = "default_card_selectors")]
    pub cards: Vec<String>,
    #[serde(default = "default_name_selectors")]
    pub name: Vec<String>,
    #[serde(default = "default_website_selectors")]
    pub website: Vec<String>,
    #[serde(default = "default_location_selectors")]
    pub location: Vec<String>,
    #[serde(default = "default_rating_selectors")]
    pub rating: Vec<String>,
    #[serde(default = "default_min_project_selectors")]
    pub min_project: Vec<String>,
    #[serde(default = "default_employee_selectors")]
    pub employees: Vec<String>,
    #[serde(default = "default_service_selectors")]
    pub services: Vec<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_csv")]
    pub output_csv: PathBuf,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_true")]
    pub write_db: bool,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// Partnership modeling job configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default = "default_enriched_csv")]
    pub enriched_csv: PathBuf,

    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_clustered_csv")]
    pub clustered_csv: PathBuf,

    #[serde(default = "default_clusters")]
    pub clusters: usize,

    #[serde(default = "default_holdout_every")]
    pub holdout_every: usize,
}

impl ScraperConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
    pub fn container_timeout(&self) -> Duration {
        Duration::from_secs(self.container_timeout_secs)
    }
    pub fn container_poll(&self) -> Duration {
        Duration::from_millis(self.container_poll_ms.max(1))
    }
    pub fn backoff_delay(&self) -> Duration {
        Duration::from_millis(self.backoff_delay_ms)
    }
    pub fn country_delay(&self) -> Duration {
        Duration::from_millis(self.country_delay_ms)
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://clutch.co".to_string()
}
fn default_category() -> String {
    "web-developers".to_string()
}
fn default_max_pages() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string()
}
fn default_settle_delay_ms() -> u64 {
    4000
}
fn default_container_timeout_secs() -> u64 {
    20
}
fn default_container_poll_ms() -> u64 {
    500
}
fn default_page_delay_ms() -> u64 {
    3500
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_backoff_delay_ms() -> u64 {
    10_000
}
fn default_country_delay_ms() -> u64 {
    6000
}
fn default_true() -> bool {
    true
}
fn default_output_csv() -> PathBuf {
    PathBuf::from("data/raw/global_partners_raw.csv")
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/partners.duckdb")
}
fn default_enriched_csv() -> PathBuf {
    PathBuf::from("data/processed/partners_enriched.csv")
}
fn default_model_path() -> PathBuf {
    PathBuf::from("data/models/partner_model.json")
}
fn default_clustered_csv() -> PathBuf {
    PathBuf::from("data/processed/partners_with_clusters.csv")
}
fn default_clusters() -> usize {
    4
}
fn default_holdout_every() -> usize {
    5
}

pub fn default_countries() -> Vec<CountryConfig> {
    vec![
        CountryConfig::new(CountryCode::Us, "United States", "us", "USD"),
        CountryConfig::new(CountryCode::Uk, "United Kingdom", "uk", "GBP"),
        CountryConfig::new(CountryCode::Au, "Australia", "au", "AUD"),
        CountryConfig::new(CountryCode::Sa, "South Africa", "za", "ZAR"),
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_container_selectors() -> Vec<String> {
    strings(&["div[class*='listing']", "div[data-clutch]", "li[class*='provider']"])
}
fn default_card_selectors() -> Vec<String> {
    strings(&[
        "div.sponsor-listing",
        "div.provider-row",
        "div.w-100 div.relative",
        "li[class*='listing']",
    ])
}
fn default_name_selectors() -> Vec<String> {
    strings(&["h3", ".company-name", ".title", "a[href*='/profile/']", "span.company"])
}
fn default_website_selectors() -> Vec<String> {
    strings(&[
        "a.website-link",
        "a[href^='http']:not([href*='/profile'])",
        "a[rel='nofollow']",
    ])
}
fn default_location_selectors() -> Vec<String> {
    strings(&[".locality", ".location", "span[class*='location']", ".city"])
}
fn default_rating_selectors() -> Vec<String> {
    strings(&[".rating", "span.rating", "[class*='rating__number']", ".stars"])
}
fn default_min_project_selectors() -> Vec<String> {
    strings(&[
        "[data-tooltip*='Minimum']",
        ".min-project-size",
        "[class*='budget']",
        ".hourly-rate",
    ])
}
fn default_employee_selectors() -> Vec<String> {
    strings(&[".employees", "[class*='team']", ".size", "span[class*='employees']"])
}
fn default_service_selectors() -> Vec<String> {
    strings(&["a.tag", ".service", "[class*='service-tag']", ".tag-cloud a"])
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            engine: SessionEngine::default(),
            headless: true,
            base_url: default_base_url(),
            category: default_category(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            settle_delay_ms: default_settle_delay_ms(),
            container_timeout_secs: default_container_timeout_secs(),
            container_poll_ms: default_container_poll_ms(),
            page_delay_ms: default_page_delay_ms(),
            jitter_ms: default_jitter_ms(),
            backoff_delay_ms: default_backoff_delay_ms(),
            country_delay_ms: default_country_delay_ms(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            container: default_container_selectors(),
            cards: default_card_selectors(),
            name: default_name_selectors(),
            website: default_website_selectors(),
            location: default_location_selectors(),
            rating: default_rating_selectors(),
            min_project: default_min_project_selectors(),
            employees: default_employee_selectors(),
            services: default_service_selectors(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_csv: default_output_csv(),
            db_path: default_db_path(),
            write_db: true,
            run_migrations: true,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enriched_csv: default_enriched_csv(),
            model_path: default_model_path(),
            clustered_csv: default_clustered_csv(),
            clusters: default_clusters(),
            holdout_every: default_holdout_every(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SCOUT").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(app_cfg)
    }

    /// Restrict the crawl to `codes`, keeping the configured order.
    pub fn retain_countries(&mut self, codes: &[CountryCode]) {
        self.countries.retain(|c| codes.contains(&c.code));
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            selectors: SelectorConfig::default(),
            countries: default_countries(),
            storage: StorageConfig::default(),
            model: ModelConfig::default(),
        }
    }
}
