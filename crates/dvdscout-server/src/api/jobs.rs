use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use dvdscout_db::SearchJobRow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{empty_as_none, map_db_error, parse_public_id, query_params, ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub(in crate::api) struct ListJobsQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct JobResponse {
    pub id: Uuid,
    pub job_type: String,
    pub status: String,
    pub parameters: Value,
    pub results: Option<Value>,
    pub error_message: Option<String>,
    pub stores_found: i32,
    pub credits_used: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<SearchJobRow> for JobResponse {
    fn from(row: SearchJobRow) -> Self {
        Self {
            id: row.public_id,
            job_type: row.job_type,
            status: row.status,
            parameters: row.parameters,
            results: row.results,
            error_message: row.error_message,
            stores_found: row.stores_found,
            credits_used: row.credits_used,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

pub(super) fn normalize_job_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 100)
}

/// GET /api/jobs: most recent first.
pub(in crate::api) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<ListJobsQuery>, QueryRejection>,
) -> Result<Json<Vec<JobResponse>>, ApiError> {
    let rid = &req_id.0;
    let params = query_params(rid, query)?;

    let rows = dvdscout_db::list_search_jobs(&state.pool, normalize_job_limit(params.limit))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(rows.into_iter().map(JobResponse::from).collect()))
}

/// GET /api/jobs/{id}
pub(in crate::api) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let rid = &req_id.0;
    let id = parse_public_id(rid, &id)?;

    let row = dvdscout_db::get_search_job(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(row.into()))
}
