//! Wire types for the dvdscout-server API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub email_confidence: Option<f64>,
    pub source: String,
    pub source_url: Option<String>,
    pub notes: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchJob {
    pub id: Uuid,
    pub job_type: String,
    pub status: String,
    #[serde(default)]
    pub parameters: Value,
    pub results: Option<Value>,
    pub error_message: Option<String>,
    pub stores_found: i32,
    pub credits_used: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SearchJob {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "pending" | "running")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stats {
    pub total_stores: i64,
    pub verified_stores: i64,
    pub stores_with_emails: i64,
    pub credits_remaining: Option<i64>,
    #[serde(default)]
    pub active_jobs: i64,
    #[serde(default)]
    pub recent_jobs: Vec<SearchJob>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobStarted {
    pub job_id: Uuid,
    pub status: String,
    pub stores_to_process: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderAccount {
    pub credits_remaining: i64,
    pub plan_name: String,
}

/// Body of `POST /stores`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewStore {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Error envelope returned by the server on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// A store field that `PUT /stores/{id}` accepts `null` for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ClearableField {
    Address,
    City,
    State,
    Phone,
    Website,
    Email,
    Notes,
}

impl ClearableField {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            ClearableField::Address => "address",
            ClearableField::City => "city",
            ClearableField::State => "state",
            ClearableField::Phone => "phone",
            ClearableField::Website => "website",
            ClearableField::Email => "email",
            ClearableField::Notes => "notes",
        }
    }
}

/// Sparse edit of a store. Fields left `None` are not sent; fields listed in
/// `clear` are sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreEdit {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub clear: Vec<ClearableField>,
}

impl StoreEdit {
    /// Builds the request body. A field that is both set and cleared is
    /// cleared.
    #[must_use]
    pub fn to_body(&self) -> serde_json::Map<String, Value> {
        let mut body = serde_json::Map::new();
        let fields = [
            ("name", &self.name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("phone", &self.phone),
            ("website", &self.website),
            ("email", &self.email),
            ("notes", &self.notes),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                body.insert(key.to_owned(), Value::String(value.clone()));
            }
        }
        for field in &self.clear {
            body.insert(field.key().to_owned(), Value::Null);
        }
        body
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_body().is_empty()
    }
}
