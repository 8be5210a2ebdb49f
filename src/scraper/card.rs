//! Card extraction: one listing card in, one agency record (or nothing) out.
//!
//! Every field is read through a [`FieldChain`], an ordered list of CSS
//! selectors tried in priority order. The first selector that yields a
//! usable value wins; when the chain is exhausted the field default
//! applies. Directory sites rename classes often, so a chain degrades to
//! older or looser selectors instead of losing the field outright.

use super::cleaner::{
    DEFAULT_EMPLOYEES, normalise_text, parse_currency_shorthand, parse_employee_range,
    parse_rating,
};
use super::error::SelectorError;
use crate::config::SelectorConfig;
use crate::models::{
    AgencyRecord, CountryConfig, SOURCE_CLUTCH, UNKNOWN_NAME, is_wordpress_specialist,
};
use scraper::{ElementRef, Selector};
use url::Url;

// ── Fallback chain ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FieldChain {
    selectors: Vec<(String, Selector)>,
}

impl FieldChain {
    pub fn parse<S: AsRef<str>>(field: &'static str, selectors: &[S]) -> Result<Self, SelectorError> {
        if selectors.is_empty() {
            return Err(SelectorError::Empty(field));
        }

        let selectors = selectors
            .iter()
            .map(|raw| {
                let raw = raw.as_ref();
                Selector::parse(raw)
                    .map(|sel| (raw.to_string(), sel))
                    .map_err(|e| SelectorError::Invalid {
                        field,
                        selector: raw.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { selectors })
    }

    /// First value produced by `extract` for any match, walking selectors in
    /// priority order and matches in document order.
    pub fn first<T>(&self, scope: ElementRef<'_>, extract: impl Fn(ElementRef<'_>) -> Option<T>) -> Option<T> {
        self.selectors
            .iter()
            .find_map(|(_, sel)| scope.select(sel).find_map(&extract))
    }

    /// All values from the first selector that yields at least one.
    pub fn all<T>(&self, scope: ElementRef<'_>, extract: impl Fn(ElementRef<'_>) -> Option<T>) -> Vec<T> {
        for (_, sel) in &self.selectors {
            let found: Vec<T> = scope.select(sel).filter_map(&extract).collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Matching elements of the first selector that matches anything,
    /// together with the selector text.
    pub fn first_matching<'a>(&'a self, scope: ElementRef<'a>) -> Option<(&'a str, Vec<ElementRef<'a>>)> {
        self.selectors.iter().find_map(|(raw, sel)| {
            let found: Vec<_> = scope.select(sel).collect();
            (!found.is_empty()).then_some((raw.as_str(), found))
        })
    }

    pub fn matches_any(&self, scope: ElementRef<'_>) -> bool {
        self.selectors
            .iter()
            .any(|(_, sel)| scope.select(sel).next().is_some())
    }
}

// ── Field extractors ──────────────────────────────────────────────────────────

fn text_of(el: ElementRef<'_>) -> Option<String> {
    let text = normalise_text(&el.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

fn absolute_href(el: ElementRef<'_>) -> Option<String> {
    let href = el.value().attr("href")?.trim();
    let url = Url::parse(href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| href.to_string())
}

// ── Card extractor ────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
pub enum CardOutcome {
    Record(AgencyRecord),
    /// No usable name: the card never becomes a record.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct CardExtractor {
    name: FieldChain,
    website: FieldChain,
    location: FieldChain,
    rating: FieldChain,
    min_project: FieldChain,
    employees: FieldChain,
    services: FieldChain,
}

impl CardExtractor {
    pub fn from_config(cfg: &SelectorConfig) -> Result<Self, SelectorError> {
        Ok(Self {
            name: FieldChain::parse("name", &cfg.name)?,
            website: FieldChain::parse("website", &cfg.website)?,
            location: FieldChain::parse("location", &cfg.location)?,
            rating: FieldChain::parse("rating", &cfg.rating)?,
            min_project: FieldChain::parse("min_project", &cfg.min_project)?,
            employees: FieldChain::parse("employees", &cfg.employees)?,
            services: FieldChain::parse("services", &cfg.services)?,
        })
    }

    /// Build a record from one card. Read-only and deterministic.
    pub fn extract(&self, card: ElementRef<'_>, country: &CountryConfig) -> CardOutcome {
        let name = self
            .name
            .first(card, text_of)
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());
        if name == UNKNOWN_NAME {
            return CardOutcome::Rejected;
        }

        let services = self.services.all(card, text_of);

        CardOutcome::Record(AgencyRecord {
            country: country.code,
            source: SOURCE_CLUTCH.to_string(),
            name,
            website: self.website.first(card, absolute_href),
            location_city: self
                .location
                .first(card, text_of)
                .unwrap_or_else(|| country.name.clone()),
            clutch_rating: self
                .rating
                .first(card, text_of)
                .map(|t| parse_rating(&t))
                .unwrap_or(0.0),
            min_project_size_usd: self
                .min_project
                .first(card, text_of)
                .map(|t| parse_currency_shorthand(&t))
                .unwrap_or(0),
            employees: self
                .employees
                .first(card, text_of)
                .map(|t| parse_employee_range(&t))
                .unwrap_or(DEFAULT_EMPLOYEES),
            is_wp_specialist: is_wordpress_specialist(&services),
            services,
        })
    }
}
