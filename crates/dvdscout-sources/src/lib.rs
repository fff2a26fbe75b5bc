//! External collaborators for store discovery: business directories, the
//! Reddit forum search, and the Hunter email-discovery API.

pub mod directory;
pub mod error;
pub mod http;
pub mod hunter;
pub mod rate_limit;
pub mod reddit;
pub mod types;

use async_trait::async_trait;

pub use directory::{YellowPagesSource, YelpSource};
pub use error::SourceError;
pub use http::HttpSettings;
pub use hunter::{domain_from_website, HunterClient};
pub use rate_limit::RequestPacer;
pub use reddit::{extract_store_names, RedditSource};
pub use types::{AccountInfo, CandidateStore, EmailCandidate, ListingQuery};

/// A place that lists stores for a free-text query.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Short identifier used in logs and job results.
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns [`SourceError`] on transport failure, a non-2xx status, or a
    /// body that cannot be parsed.
    async fn search(&self, query: &ListingQuery) -> Result<Vec<CandidateStore>, SourceError>;
}

/// A paid service that finds email addresses for a domain.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Current credit balance and plan.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unauthorized`] for a rejected key, or another
    /// [`SourceError`] on transport or parse failure.
    async fn account(&self) -> Result<AccountInfo, SourceError>;

    /// Up to `limit` addresses for `domain`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unauthorized`], [`SourceError::RateLimited`],
    /// or another [`SourceError`] on transport or parse failure.
    async fn domain_search(
        &self,
        domain: &str,
        limit: u32,
    ) -> Result<Vec<EmailCandidate>, SourceError>;
}
