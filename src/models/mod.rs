use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Origin site stamped on every record.
pub const SOURCE_CLUTCH: &str = "clutch.co";

/// Name placeholder for cards whose name chain matched nothing.
pub const UNKNOWN_NAME: &str = "Unknown";

// ── Country ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CountryCode {
    Us,
    Uk,
    Au,
    Sa,
}

impl CountryCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountryCode::Us => "US",
            CountryCode::Uk => "UK",
            CountryCode::Au => "AU",
            CountryCode::Sa => "SA",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountryCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "US" => Ok(CountryCode::Us),
            "UK" | "GB" => Ok(CountryCode::Uk),
            "AU" => Ok(CountryCode::Au),
            "SA" | "ZA" => Ok(CountryCode::Sa),
            other => Err(format!("unknown country code: {other}")),
        }
    }
}

/// Static reference data for one crawlable country.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryConfig {
    pub code: CountryCode,
    pub name: String,
    pub slug: String,
    pub currency: String,
}

impl CountryConfig {
    pub fn new(code: CountryCode, name: &str, slug: &str, currency: &str) -> Self {
        Self {
            code,
            name: name.to_string(),
            slug: slug.to_string(),
            currency: currency.to_string(),
        }
    }
}

// ── Agency ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgencyRecord {
    pub country: CountryCode,
    pub source: String,
    pub name: String,
    pub website: Option<String>,
    pub location_city: String,
    pub clutch_rating: f64,
    pub min_project_size_usd: u64,
    pub employees: u32,
    pub services: Vec<String>,
    pub is_wp_specialist: bool,
}

pub fn is_wordpress_specialist(services: &[String]) -> bool {
    services
        .iter()
        .any(|s| s.to_lowercase().contains("wordpress"))
}

// ── Dataset rows ──────────────────────────────────────────────────────────────

/// Separator used to flatten `services` into one CSV cell.
pub const SERVICES_SEPARATOR: &str = "; ";

/// Flat CSV shape of an `AgencyRecord`. Column order is the dataset contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgencyRow {
    pub country: CountryCode,
    pub source: String,
    pub name: String,
    pub website: Option<String>,
    pub location_city: String,
    pub clutch_rating: f64,
    pub min_project_size_usd: u64,
    pub employees: u32,
    pub services: String,
    pub is_wp_specialist: bool,
}

impl From<&AgencyRecord> for AgencyRow {
    fn from(r: &AgencyRecord) -> Self {
        Self {
            country: r.country,
            source: r.source.clone(),
            name: r.name.clone(),
            website: r.website.clone(),
            location_city: r.location_city.clone(),
            clutch_rating: r.clutch_rating,
            min_project_size_usd: r.min_project_size_usd,
            employees: r.employees,
            services: r.services.join(SERVICES_SEPARATOR),
            is_wp_specialist: r.is_wp_specialist,
        }
    }
}

impl From<AgencyRow> for AgencyRecord {
    fn from(row: AgencyRow) -> Self {
        let services = split_services(&row.services);
        Self {
            country: row.country,
            source: row.source,
            name: row.name,
            website: row.website.filter(|w| !w.trim().is_empty()),
            location_city: row.location_city,
            clutch_rating: row.clutch_rating,
            min_project_size_usd: row.min_project_size_usd,
            employees: row.employees,
            services,
            is_wp_specialist: row.is_wp_specialist,
        }
    }
}

pub fn split_services(cell: &str) -> Vec<String> {
    cell.split(SERVICES_SEPARATOR.trim())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Enriched partners (modeling input/output) ─────────────────────────────────

/// Dataset row plus the two externally supplied enrichment columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedPartner {
    pub country: String,
    #[serde(default)]
    pub source: String,
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location_city: String,
    #[serde(default)]
    pub clutch_rating: f64,
    #[serde(default)]
    pub min_project_size_usd: u64,
    #[serde(default)]
    pub employees: u32,
    #[serde(default)]
    pub services: String,
    #[serde(default)]
    pub is_wp_specialist: bool,
    pub kaycore_fit_score: f64,
    pub revenue_usd: f64,
}

/// Final modeling table row, one per partner.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClusteredPartner {
    pub country: String,
    pub source: String,
    pub name: String,
    pub website: Option<String>,
    pub location_city: String,
    pub clutch_rating: f64,
    pub min_project_size_usd: u64,
    pub employees: u32,
    pub services: String,
    pub is_wp_specialist: bool,
    pub kaycore_fit_score: f64,
    pub revenue_usd: f64,
    pub success: u8,
    pub cluster: usize,
}
