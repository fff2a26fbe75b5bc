//! Typed HTTP client for the dvdscout-server API.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::types::{
    ErrorEnvelope, JobStarted, NewStore, ProviderAccount, SearchJob, Stats, Store, StoreEdit,
};
use crate::view::StoreListView;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({code}, HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("failed to deserialize {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ClientError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}

pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client rooted at `base_url` (e.g. `http://localhost:8001/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if `base_url` does not parse, or
    /// [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, ClientError> {
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })?;
        let builder = self.client.request(method, url);
        Ok(match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        context: &str,
    ) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| ClientError::Deserialize {
            context: context.to_owned(),
            source,
        })
    }

    /// `GET /stats`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn stats(&self) -> Result<Stats, ClientError> {
        self.send(self.request(Method::GET, "stats")?, "stats").await
    }

    /// `GET /stores` with the view's filters and page.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn list_stores(&self, view: &StoreListView) -> Result<Vec<Store>, ClientError> {
        let builder = self
            .request(Method::GET, "stores")?
            .query(&view.query_pairs());
        self.send(builder, "store list").await
    }

    /// `GET /stores/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn get_store(&self, id: Uuid) -> Result<Store, ClientError> {
        self.send(self.request(Method::GET, &format!("stores/{id}"))?, "store")
            .await
    }

    /// `POST /stores`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn create_store(&self, store: &NewStore) -> Result<Store, ClientError> {
        let builder = self.request(Method::POST, "stores")?.json(store);
        self.send(builder, "created store").await
    }

    /// `PUT /stores/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn update_store(&self, id: Uuid, edit: &StoreEdit) -> Result<Store, ClientError> {
        let builder = self
            .request(Method::PUT, &format!("stores/{id}"))?
            .json(&edit.to_body());
        self.send(builder, "updated store").await
    }

    /// `POST /stores/{id}/verify`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn verify_store(&self, id: Uuid) -> Result<Store, ClientError> {
        let builder = self.request(Method::POST, &format!("stores/{id}/verify"))?;
        self.send(builder, "verified store").await
    }

    /// `DELETE /stores/{id}`; returns the server's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn delete_store(&self, id: Uuid) -> Result<String, ClientError> {
        let builder = self.request(Method::DELETE, &format!("stores/{id}"))?;
        let body: Value = self.send(builder, "delete confirmation").await?;
        Ok(body["message"].as_str().unwrap_or("deleted").to_owned())
    }

    /// `POST /search/directory`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn start_directory_search(
        &self,
        query: Option<&str>,
        location: Option<&str>,
        max_results: Option<u32>,
    ) -> Result<JobStarted, ClientError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(query) = query {
            params.push(("query", query.to_owned()));
        }
        if let Some(location) = location {
            params.push(("location", location.to_owned()));
        }
        if let Some(max_results) = max_results {
            params.push(("max_results", max_results.to_string()));
        }
        let builder = self
            .request(Method::POST, "search/directory")?
            .query(&params);
        self.send(builder, "directory search").await
    }

    /// `POST /search/reddit`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn start_reddit_search(
        &self,
        query: Option<&str>,
        max_posts: Option<u32>,
    ) -> Result<JobStarted, ClientError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(query) = query {
            params.push(("query", query.to_owned()));
        }
        if let Some(max_posts) = max_posts {
            params.push(("max_posts", max_posts.to_string()));
        }
        let builder = self.request(Method::POST, "search/reddit")?.query(&params);
        self.send(builder, "reddit search").await
    }

    /// `POST /search/emails`. An empty `store_ids` lets the server pick every
    /// store with a website and no email.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn start_email_discovery(&self, store_ids: &[Uuid]) -> Result<JobStarted, ClientError> {
        let mut builder = self.request(Method::POST, "search/emails")?;
        if !store_ids.is_empty() {
            builder = builder.json(&json!({ "store_ids": store_ids }));
        }
        self.send(builder, "email discovery").await
    }

    /// `GET /jobs`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn list_jobs(&self, limit: u32) -> Result<Vec<SearchJob>, ClientError> {
        let builder = self
            .request(Method::GET, "jobs")?
            .query(&[("limit", limit.to_string())]);
        self.send(builder, "job list").await
    }

    /// `GET /jobs/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn get_job(&self, id: Uuid) -> Result<SearchJob, ClientError> {
        self.send(self.request(Method::GET, &format!("jobs/{id}"))?, "job")
            .await
    }

    /// `GET /provider/account`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, API, or decode failures.
    pub async fn provider_account(&self) -> Result<ProviderAccount, ClientError> {
        self.send(
            self.request(Method::GET, "provider/account")?,
            "provider account",
        )
        .await
    }
}

/// Turns a non-2xx response into [`ClientError::Api`], reading the error
/// envelope when the server sent one.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (
            "http_error".to_owned(),
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned(),
        ),
    };

    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
