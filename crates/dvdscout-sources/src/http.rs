//! Shared HTTP plumbing for listing sources and the email provider.

use std::time::Duration;

use dvdscout_core::AppConfig;
use reqwest::{Client, StatusCode, Url};

use crate::error::SourceError;

/// Transport settings shared by every outbound client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Base pause after each scraped page; the actual pause is jittered.
    pub inter_request_delay: Duration,
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.scraper_request_timeout_secs,
            user_agent: config.scraper_user_agent.clone(),
            inter_request_delay: Duration::from_millis(config.scraper_inter_request_delay_ms),
        }
    }
}

/// Builds a `reqwest` client with the configured timeout and user agent.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the client cannot be constructed.
pub(crate) fn build_client(settings: &HttpSettings) -> Result<Client, SourceError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(settings.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Parses `base_url` and guarantees exactly one trailing slash, so that
/// [`Url::join`] appends to the path instead of replacing its last segment.
///
/// # Errors
///
/// Returns [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, SourceError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| SourceError::InvalidBaseUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })
}

/// Joins `path` onto a base produced by [`parse_base_url`].
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, SourceError> {
    base.join(path).map_err(|e| SourceError::InvalidBaseUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

/// Sends a GET and returns the body text along with the final URL after
/// redirects. Non-2xx statuses become [`SourceError::UnexpectedStatus`].
pub(crate) async fn get_text(client: &Client, url: Url) -> Result<(String, Url), SourceError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let final_url = response.url().clone();
    if !status.is_success() {
        return Err(unexpected_status(status, &final_url));
    }
    let body = response.text().await?;
    Ok((body, final_url))
}

pub(crate) fn unexpected_status(status: StatusCode, url: &Url) -> SourceError {
    SourceError::UnexpectedStatus {
        status: status.as_u16(),
        url: redact_query(url),
    }
}

/// Drops the query string so API keys never reach logs or error messages.
pub(crate) fn redact_query(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_a_single_trailing_slash() {
        let base = parse_base_url("https://api.hunter.io/v2///").expect("valid");
        assert_eq!(base.as_str(), "https://api.hunter.io/v2/");
        let url = endpoint(&base, "domain-search").expect("join");
        assert_eq!(url.as_str(), "https://api.hunter.io/v2/domain-search");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = parse_base_url("not a url").expect_err("should fail");
        assert!(matches!(err, SourceError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn redact_query_strips_api_key() {
        let url = Url::parse("https://api.hunter.io/v2/account?api_key=secret").expect("valid");
        assert_eq!(redact_query(&url), "https://api.hunter.io/v2/account");
    }
}
