//! HTTP client for the Hunter email-discovery API.
//!
//! Every request carries the API key as a query parameter and passes through
//! a shared [`RequestPacer`]. Status codes are mapped to [`SourceError`]
//! variants so callers can tell bad credentials from exhausted credits.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{endpoint, parse_base_url, redact_query, unexpected_status};
use crate::rate_limit::RequestPacer;
use crate::types::{AccountInfo, EmailCandidate};
use crate::EmailProvider;

pub const DEFAULT_HUNTER_BASE_URL: &str = "https://api.hunter.io/v2";
const SERVICE: &str = "hunter";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct DomainSearchData {
    #[serde(default)]
    emails: Vec<EmailCandidate>,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    plan_name: Option<String>,
    calls: Option<Calls>,
}

#[derive(Debug, Deserialize)]
struct Calls {
    left: Option<i64>,
    used: Option<i64>,
    available: Option<i64>,
}

impl Calls {
    fn remaining(&self) -> i64 {
        self.left.unwrap_or_else(|| {
            (self.available.unwrap_or(0) - self.used.unwrap_or(0)).max(0)
        })
    }
}

/// Client for the Hunter REST API.
///
/// Use [`HunterClient::new`] for production or [`HunterClient::with_base_url`]
/// to point at a mock server in tests.
pub struct HunterClient {
    client: Client,
    api_key: String,
    base_url: Url,
    pacer: RequestPacer,
}

impl std::fmt::Debug for HunterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HunterClient")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HunterClient {
    /// Creates a client pointed at the production Hunter API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_HUNTER_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`SourceError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("dvdscout/0.1 (email-discovery)")
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url: parse_base_url(base_url)?,
            pacer: RequestPacer::default(),
        })
    }

    /// Replaces the default 15/s, 500/min pacer.
    #[must_use]
    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = pacer;
        self
    }

    fn build_url(&self, path: &str, extra: &[(&str, &str)]) -> Result<Url, SourceError> {
        let mut url = endpoint(&self.base_url, path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("api_key", &self.api_key);
        }
        Ok(url)
    }

    /// Paces, sends a GET, maps error statuses, and parses the JSON body.
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, SourceError> {
        self.pacer.acquire().await;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SourceError::Http(e.without_url()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => {
                return Err(SourceError::Unauthorized {
                    service: SERVICE.to_owned(),
                })
            }
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                return Err(SourceError::RateLimited {
                    service: SERVICE.to_owned(),
                })
            }
            status => return Err(unexpected_status(status, &url)),
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Http(e.without_url()))?;
        serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
            context: format!("{context} ({})", redact_query(&url)),
            source: e,
        })
    }
}

#[async_trait]
impl EmailProvider for HunterClient {
    async fn account(&self) -> Result<AccountInfo, SourceError> {
        let url = self.build_url("account", &[])?;
        let envelope: Envelope<AccountData> = self.request(url, "account").await?;

        Ok(AccountInfo {
            credits_remaining: envelope.data.calls.as_ref().map_or(0, Calls::remaining),
            plan_name: envelope
                .data
                .plan_name
                .unwrap_or_else(|| "unknown".to_owned()),
        })
    }

    async fn domain_search(
        &self,
        domain: &str,
        limit: u32,
    ) -> Result<Vec<EmailCandidate>, SourceError> {
        let limit = limit.to_string();
        let url = self.build_url("domain-search", &[("domain", domain), ("limit", &limit)])?;
        let envelope: Envelope<DomainSearchData> = self
            .request(url, &format!("domain-search(domain={domain})"))
            .await?;

        let mut emails: Vec<EmailCandidate> = envelope
            .data
            .emails
            .into_iter()
            .filter(|e| !e.value.trim().is_empty())
            .collect();
        emails.sort_by_key(|e| std::cmp::Reverse(e.confidence));
        Ok(emails)
    }
}

/// Reduces a website to the bare domain Hunter expects: scheme, `www.`,
/// port, path, query, and fragment are dropped and the host is lowercased.
///
/// Returns `None` when nothing host-like remains.
#[must_use]
pub fn domain_from_website(website: &str) -> Option<String> {
    let trimmed = website.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
    let host = host.split(':').next().unwrap_or_default().to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    (!host.is_empty() && host.contains('.')).then(|| host.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_strips_scheme_www_and_path() {
        assert_eq!(
            domain_from_website("https://www.RetroFlicks.com/about?x=1").as_deref(),
            Some("retroflicks.com")
        );
        assert_eq!(
            domain_from_website("http://tapetown.net").as_deref(),
            Some("tapetown.net")
        );
        assert_eq!(
            domain_from_website("reeldeal.com/contact").as_deref(),
            Some("reeldeal.com")
        );
        assert_eq!(
            domain_from_website("  https://shop.discdepot.co.uk:8443/  ").as_deref(),
            Some("shop.discdepot.co.uk")
        );
    }

    #[test]
    fn domain_rejects_hostless_values() {
        assert_eq!(domain_from_website(""), None);
        assert_eq!(domain_from_website("https://"), None);
        assert_eq!(domain_from_website("localhost"), None);
    }

    #[test]
    fn build_url_appends_key_last() {
        let client = HunterClient::with_base_url("k3y", 5, "https://api.hunter.io/v2")
            .expect("client construction should not fail");
        let url = client
            .build_url("domain-search", &[("domain", "retroflicks.com"), ("limit", "5")])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.hunter.io/v2/domain-search?domain=retroflicks.com&limit=5&api_key=k3y"
        );
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let client = HunterClient::with_base_url("super-secret", 5, "https://api.hunter.io/v2")
            .expect("client construction should not fail");
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn remaining_calls_fall_back_to_available_minus_used() {
        let calls = Calls {
            left: None,
            used: Some(10),
            available: Some(25),
        };
        assert_eq!(calls.remaining(), 15);
        let calls = Calls {
            left: Some(7),
            used: None,
            available: None,
        };
        assert_eq!(calls.remaining(), 7);
    }
}
