//! Reddit forum source: public `search.json` plus store-name extraction.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use dvdscout_core::StoreSource;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{build_client, endpoint, get_text, parse_base_url, HttpSettings};
use crate::rate_limit::jittered_delay;
use crate::types::{CandidateStore, ListingQuery};
use crate::ListingSource;

pub const DEFAULT_REDDIT_BASE_URL: &str = "https://www.reddit.com";
const PERMALINK_HOST: &str = "https://reddit.com";
/// Reddit caps a listing page at 100 posts.
const MAX_PAGE_LIMIT: usize = 100;
const NOTE_TITLE_CHARS: usize = 100;

/// "Hollywood Video", "Eastside DVD Store", "Main Records Shop".
static STORE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Z][a-z]+ (?:DVD|Video|Movies?|Records?)(?:\s+(?:Store|Shop|Outlet))?)\b")
        .expect("valid regex")
});
/// "Vinnie's Video", "Joe’s DVD".
static POSSESSIVE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Z][a-z]+['’]s (?:DVD|Video|Movies?|Records?))\b").expect("valid regex")
});

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    data: PostData,
}

#[derive(Debug, Default, Deserialize)]
struct PostData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    permalink: Option<String>,
}

pub struct RedditSource {
    client: Client,
    base_url: Url,
    settings: HttpSettings,
}

impl RedditSource {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: HttpSettings) -> Result<Self, SourceError> {
        Self::with_base_url(settings, DEFAULT_REDDIT_BASE_URL)
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
impl ListingSource for RedditSource {
    fn name(&self) -> &'static str {
        "reddit"
    }

    /// `max_results` bounds the number of posts scanned, not the number of
    /// candidates returned.
    async fn search(&self, query: &ListingQuery) -> Result<Vec<CandidateStore>, SourceError> {
        let limit = query.max_results.clamp(1, MAX_PAGE_LIMIT);
        let mut url = endpoint(&self.base_url, "search.json")?;
        url.query_pairs_mut()
            .append_pair("q", &query.query)
            .append_pair("limit", &limit.to_string())
            .append_pair("sort", "relevance");

        let (body, _) = get_text(&self.client, url).await?;
        let listing: Listing =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: format!("reddit search(q={})", query.query),
                source: e,
            })?;

        let posts = listing.data.children.len();
        let stores = candidates_from_posts(listing.data.children.into_iter().map(|p| p.data));
        tracing::debug!(posts, candidates = stores.len(), "scanned reddit posts");

        jittered_delay(self.settings.inter_request_delay).await;
        Ok(stores)
    }
}

/// Turns posts into candidates, keeping the first mention of each name
/// (case-insensitive) across the whole result set.
fn candidates_from_posts(posts: impl IntoIterator<Item = PostData>) -> Vec<CandidateStore> {
    let mut seen = HashSet::new();
    let mut stores = Vec::new();

    for post in posts {
        let text = format!("{} {}", post.title, post.selftext);
        let source_url = post
            .permalink
            .as_deref()
            .map(|permalink| format!("{PERMALINK_HOST}{permalink}"));
        let title: String = post.title.chars().take(NOTE_TITLE_CHARS).collect();

        for name in extract_store_names(&text) {
            if !seen.insert(name.to_lowercase()) {
                continue;
            }
            stores.push(CandidateStore {
                name,
                source: StoreSource::Reddit,
                source_url: source_url.clone(),
                notes: Some(format!("Found in Reddit post: {title}...")),
                ..CandidateStore::default()
            });
        }
    }

    stores
}

/// Finds phrases that look like store names, in order of appearance per
/// pattern. Matching is case-insensitive, so the results are noisy by nature.
#[must_use]
pub fn extract_store_names(text: &str) -> Vec<String> {
    [&*STORE_NAME_RE, &*POSSESSIVE_NAME_RE]
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}
