use super::card::{CardExtractor, CardOutcome, FieldChain};
use super::error::SelectorError;
use crate::config::SelectorConfig;
use crate::models::{AgencyRecord, CountryConfig};
use scraper::{ElementRef, Html};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

/// Everything pulled out of one listing page.
#[derive(Debug, Default)]
pub struct PageExtraction {
    /// Card selector that matched, if any did.
    pub card_selector: Option<String>,
    pub cards_seen: usize,
    pub records: Vec<AgencyRecord>,
    pub rejected: usize,
    pub failed: usize,
}

/// Page-level parsing: hydration check, card discovery, per-card extraction.
#[derive(Debug, Clone)]
pub struct ListingParser {
    containers: FieldChain,
    cards: FieldChain,
    extractor: CardExtractor,
}

impl ListingParser {
    pub fn from_config(cfg: &SelectorConfig) -> Result<Self, SelectorError> {
        Ok(Self {
            containers: FieldChain::parse("container", &cfg.container)?,
            cards: FieldChain::parse("cards", &cfg.cards)?,
            extractor: CardExtractor::from_config(cfg)?,
        })
    }

    /// True once any listing-container indicator is present.
    pub fn has_listing_container(&self, html: &str) -> bool {
        let doc = Html::parse_document(html);
        self.containers.matches_any(doc.root_element())
    }

    pub fn parse_listing_page(&self, html: &str, country: &CountryConfig) -> PageExtraction {
        let doc = Html::parse_document(html);

        let Some((selector, cards)) = self.cards.first_matching(doc.root_element()) else {
            return PageExtraction::default();
        };
        debug!("Found {} cards using selector: {}", cards.len(), selector);

        let mut page = collect_cards(cards, |card| self.extractor.extract(card, country));
        page.card_selector = Some(selector.to_string());
        page
    }
}

/// Run `extract` over every card. A panic inside one card is contained to
/// that card and counted as a failure.
pub fn collect_cards<'a, F>(cards: Vec<ElementRef<'a>>, extract: F) -> PageExtraction
where
    F: Fn(ElementRef<'a>) -> CardOutcome,
{
    let mut page = PageExtraction {
        cards_seen: cards.len(),
        ..Default::default()
    };

    for (idx, card) in cards.into_iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| extract(card))) {
            Ok(CardOutcome::Record(record)) => page.records.push(record),
            Ok(CardOutcome::Rejected) => {
                debug!("Card {} has no usable name, skipping", idx);
                page.rejected += 1;
            }
            Err(payload) => {
                warn!("Failed to parse card {}: {}", idx, panic_message(&*payload));
                page.failed += 1;
            }
        }
    }

    page
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
