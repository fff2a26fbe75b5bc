//! Job launch handlers. Each creates a `pending` job row, queues it, and
//! returns without waiting for the work.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use dvdscout_core::JobType;
use dvdscout_sources::ListingQuery;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::worker::{JobKind, JobRequest};

use super::{empty_as_none, map_db_error, query_params, ApiError, AppState};

const DEFAULT_DIRECTORY_QUERY: &str = "DVD store";
const DEFAULT_DIRECTORY_LOCATION: &str = "United States";
const DEFAULT_REDDIT_QUERY: &str = "DVD store recommendations";
const DEFAULT_MAX_RESULTS: usize = 100;
/// Upper bound on stores picked automatically for email discovery.
const EMAIL_TARGET_LIMIT: i64 = 1000;

#[derive(Debug, Default, Deserialize)]
pub(in crate::api) struct DirectorySearchQuery {
    pub query: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(in crate::api) struct RedditSearchQuery {
    pub query: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_posts: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(in crate::api) struct EmailDiscoveryRequest {
    pub store_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct JobStarted {
    pub job_id: Uuid,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stores_to_process: Option<usize>,
}

fn non_blank(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Persists a pending job and hands it to the dispatcher.
async fn launch(
    state: &AppState,
    rid: &str,
    kind: JobKind,
    parameters: &Value,
) -> Result<Uuid, ApiError> {
    let job_type: JobType = kind.job_type();
    let row = dvdscout_db::create_search_job(&state.pool, job_type, parameters)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?;
    let job_id = row.public_id;

    state
        .queue
        .enqueue(JobRequest { job_id, kind })
        .map_err(|e| {
            tracing::error!(%job_id, error = %e, "could not queue job");
            ApiError::new(rid, "internal_error", "job queue is unavailable")
        })?;

    tracing::info!(%job_id, %job_type, "job queued");
    Ok(job_id)
}

/// POST /api/search/directory
pub(in crate::api) async fn start_directory_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<DirectorySearchQuery>, QueryRejection>,
) -> Result<Json<JobStarted>, ApiError> {
    let rid = &req_id.0;
    let params = query_params(rid, query)?;

    let listing = ListingQuery {
        query: non_blank(params.query, DEFAULT_DIRECTORY_QUERY),
        location: Some(non_blank(params.location, DEFAULT_DIRECTORY_LOCATION)),
        max_results: params.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
    };
    let parameters = json!({
        "query": listing.query,
        "location": listing.location,
        "max_results": listing.max_results,
    });

    let job_id = launch(&state, rid, JobKind::Directory(listing), &parameters).await?;
    Ok(Json(JobStarted {
        job_id,
        status: "started",
        stores_to_process: None,
    }))
}

/// POST /api/search/reddit
pub(in crate::api) async fn start_reddit_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<RedditSearchQuery>, QueryRejection>,
) -> Result<Json<JobStarted>, ApiError> {
    let rid = &req_id.0;
    let params = query_params(rid, query)?;

    let listing = ListingQuery {
        query: non_blank(params.query, DEFAULT_REDDIT_QUERY),
        location: None,
        max_results: params.max_posts.unwrap_or(DEFAULT_MAX_RESULTS),
    };
    let parameters = json!({
        "query": listing.query,
        "max_posts": listing.max_results,
    });

    let job_id = launch(&state, rid, JobKind::Reddit(listing), &parameters).await?;
    Ok(Json(JobStarted {
        job_id,
        status: "started",
        stores_to_process: None,
    }))
}

/// POST /api/search/emails
///
/// The body is optional. Without `store_ids`, or with an empty list, every
/// store that has a website and no email is targeted.
pub(in crate::api) async fn start_email_discovery(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<JobStarted>, ApiError> {
    let rid = &req_id.0;

    let request: EmailDiscoveryRequest = if body.iter().all(u8::is_ascii_whitespace) {
        EmailDiscoveryRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::new(
                rid,
                "validation_error",
                format!("invalid request body: {e}"),
            )
        })?
    };

    let store_ids = match request.store_ids {
        Some(ids) if !ids.is_empty() => ids,
        _ => dvdscout_db::list_store_ids_missing_email(&state.pool, EMAIL_TARGET_LIMIT)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?,
    };
    let stores_to_process = store_ids.len();
    let parameters = json!({ "store_ids": store_ids });

    let job_id = launch(&state, rid, JobKind::Emails { store_ids }, &parameters).await?;
    Ok(Json(JobStarted {
        job_id,
        status: "started",
        stores_to_process: Some(stores_to_process),
    }))
}
