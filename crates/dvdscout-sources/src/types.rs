use dvdscout_core::StoreSource;
use serde::{Deserialize, Serialize};

/// Parameters for one listing search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub query: String,
    /// Free-form place name. Forum sources ignore it.
    pub location: Option<String>,
    /// Upper bound on candidates (or posts, for forum sources) to return.
    pub max_results: usize,
}

/// A store extracted from an external listing, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CandidateStore {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub source: StoreSource,
    pub source_url: Option<String>,
    pub notes: Option<String>,
}

/// One email address returned by a domain lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailCandidate {
    pub value: String,
    /// Provider score in `0..=100`.
    #[serde(default)]
    pub confidence: u8,
}

/// Credit balance and plan for the email provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub credits_remaining: i64,
    pub plan_name: String,
}
