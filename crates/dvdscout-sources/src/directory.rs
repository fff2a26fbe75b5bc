//! Business-directory listing sources (Yellow Pages and Yelp).
//!
//! Both sources fetch a single search-results page and parse it with the
//! `scraper` crate. Markup drifts; a page with no recognised result cards
//! yields an empty list rather than an error.

use std::sync::LazyLock;

use async_trait::async_trait;
use dvdscout_core::StoreSource;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};

use crate::error::SourceError;
use crate::http::{build_client, endpoint, get_text, parse_base_url, HttpSettings};
use crate::rate_limit::jittered_delay;
use crate::types::{CandidateStore, ListingQuery};
use crate::ListingSource;

pub const DEFAULT_YELLOW_PAGES_BASE_URL: &str = "https://www.yellowpages.com";
pub const DEFAULT_YELP_BASE_URL: &str = "https://www.yelp.com";

static YP_RESULT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.result").expect("valid selector"));
static YP_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.business-name").expect("valid selector"));
static YP_STREET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.street-address").expect("valid selector"));
static YP_LOCALITY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.locality").expect("valid selector"));
static YP_PHONE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.phones").expect("valid selector"));
static YP_WEBSITE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.track-visit-website").expect("valid selector"));

static YELP_CARD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[data-testid="serp-ia-card"]"#).expect("valid selector")
});
static YELP_NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[data-analytics-label="biz-name"]"#).expect("valid selector")
});

// ---------------------------------------------------------------------------
// Yellow Pages
// ---------------------------------------------------------------------------

pub struct YellowPagesSource {
    client: Client,
    base_url: Url,
    settings: HttpSettings,
}

impl YellowPagesSource {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: HttpSettings) -> Result<Self, SourceError> {
        Self::with_base_url(settings, DEFAULT_YELLOW_PAGES_BASE_URL)
    }

    /// Creates a source pointed at a custom host (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built, or
    /// [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(settings: HttpSettings, base_url: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(&settings)?,
            base_url: parse_base_url(base_url)?,
            settings,
        })
    }
}

#[async_trait]
impl ListingSource for YellowPagesSource {
    fn name(&self) -> &'static str {
        "yellow_pages"
    }

    async fn search(&self, query: &ListingQuery) -> Result<Vec<CandidateStore>, SourceError> {
        let mut url = endpoint(&self.base_url, "search")?;
        url.query_pairs_mut()
            .append_pair("search_terms", &query.query)
            .append_pair("geo_location_terms", query.location.as_deref().unwrap_or(""));

        let (html, final_url) = get_text(&self.client, url).await?;
        let stores = parse_yellow_pages(&html, final_url.as_str(), query.max_results);
        tracing::debug!(count = stores.len(), "parsed yellow pages results");

        jittered_delay(self.settings.inter_request_delay).await;
        Ok(stores)
    }
}

/// Extracts up to `max_results` stores from a Yellow Pages results page.
/// Cards without a business name are skipped.
#[must_use]
pub fn parse_yellow_pages(html: &str, page_url: &str, max_results: usize) -> Vec<CandidateStore> {
    let document = Html::parse_document(html);

    document
        .select(&YP_RESULT)
        .filter_map(|card| {
            let name = first_text(card, &YP_NAME)?;
            let (city, state) = first_text(card, &YP_LOCALITY)
                .map(|locality| split_locality(&locality))
                .unwrap_or_default();
            let website = card
                .select(&YP_WEBSITE)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty())
                .map(str::to_owned);

            Some(CandidateStore {
                name,
                address: first_text(card, &YP_STREET),
                city,
                state,
                phone: first_text(card, &YP_PHONE),
                website,
                source: StoreSource::Directory,
                source_url: Some(page_url.to_owned()),
                notes: Some("Listed on Yellow Pages".to_owned()),
            })
        })
        .take(max_results)
        .collect()
}

// ---------------------------------------------------------------------------
// Yelp
// ---------------------------------------------------------------------------

pub struct YelpSource {
    client: Client,
    base_url: Url,
    settings: HttpSettings,
}

impl YelpSource {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: HttpSettings) -> Result<Self, SourceError> {
        Self::with_base_url(settings, DEFAULT_YELP_BASE_URL)
    }

    /// Creates a source pointed at a custom host (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built, or
    /// [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(settings: HttpSettings, base_url: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(&settings)?,
            base_url: parse_base_url(base_url)?,
            settings,
        })
    }
}

#[async_trait]
impl ListingSource for YelpSource {
    fn name(&self) -> &'static str {
        "yelp"
    }

    async fn search(&self, query: &ListingQuery) -> Result<Vec<CandidateStore>, SourceError> {
        let mut url = endpoint(&self.base_url, "search")?;
        url.query_pairs_mut()
            .append_pair("find_desc", &query.query)
            .append_pair("find_loc", query.location.as_deref().unwrap_or(""));

        let (html, final_url) = get_text(&self.client, url).await?;
        let stores = parse_yelp(&html, final_url.as_str(), query.max_results);
        tracing::debug!(count = stores.len(), "parsed yelp results");

        jittered_delay(self.settings.inter_request_delay).await;
        Ok(stores)
    }
}

/// Extracts up to `max_results` store names from a Yelp results page.
///
/// Yelp cards expose little beyond the name without a per-business fetch.
#[must_use]
pub fn parse_yelp(html: &str, page_url: &str, max_results: usize) -> Vec<CandidateStore> {
    let document = Html::parse_document(html);

    document
        .select(&YELP_CARD)
        .filter_map(|card| {
            let name = first_text(card, &YELP_NAME)?;
            Some(CandidateStore {
                name,
                source: StoreSource::Directory,
                source_url: Some(page_url.to_owned()),
                notes: Some("Listed on Yelp".to_owned()),
                ..CandidateStore::default()
            })
        })
        .take(max_results)
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Whitespace-collapsed text of the first match, or `None` if absent or blank.
fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// Splits `"Austin, TX 78701"` into `("Austin", "TX")`.
///
/// Without a comma the whole string is taken as the city.
fn split_locality(locality: &str) -> (Option<String>, Option<String>) {
    let Some((city, rest)) = locality.split_once(',') else {
        return (Some(locality.trim().to_owned()), None);
    };

    let city = Some(city.trim().to_owned()).filter(|c| !c.is_empty());
    let state = rest
        .split_whitespace()
        .next()
        .filter(|token| token.len() == 2 && token.chars().all(|c| c.is_ascii_alphabetic()))
        .map(str::to_ascii_uppercase);
    (city, state)
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
