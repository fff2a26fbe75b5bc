//! Database operations for `search_jobs`, the append-only job history.

use chrono::{DateTime, Utc};
use dvdscout_core::{JobStatus, JobType};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const JOB_COLUMNS: &str = "id, public_id, job_type, status, parameters, results, error_message, \
     stores_found, credits_used, created_at, started_at, completed_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `search_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchJobRow {
    pub id: i64,
    pub public_id: Uuid,
    pub job_type: String,
    pub status: String,
    pub parameters: Value,
    pub results: Option<Value>,
    pub error_message: Option<String>,
    /// `INTEGER NOT NULL DEFAULT 0`; never decreases.
    pub stores_found: i32,
    /// `INTEGER NOT NULL DEFAULT 0`; only email discovery spends credits.
    pub credits_used: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SearchJobRow {
    /// Parses the stored status string.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Core`] if the column holds an unknown status.
    pub fn job_status(&self) -> Result<JobStatus, DbError> {
        Ok(self.status.parse::<JobStatus>()?)
    }
}

/// Values written alongside a status transition.
///
/// Counters are raised to the given value but never lowered.
#[derive(Debug, Clone, Default)]
pub struct JobSummary<'a> {
    pub stores_found: Option<i32>,
    pub credits_used: Option<i32>,
    pub results: Option<&'a Value>,
    pub error_message: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Creates a job in `pending` status and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_search_job(
    pool: &PgPool,
    job_type: JobType,
    parameters: &Value,
) -> Result<SearchJobRow, DbError> {
    let row = sqlx::query_as::<_, SearchJobRow>(&format!(
        "INSERT INTO search_jobs (public_id, job_type, status, parameters) \
         VALUES ($1, $2, 'pending', $3) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(job_type.as_str())
    .bind(parameters)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Moves a job to `to`, enforcing the `pending → running → terminal` order.
///
/// The move is a compare-and-set on the status observed before the update,
/// so a concurrent transition makes this call fail instead of overwriting.
/// Entering `running` stamps `started_at`; entering a terminal state stamps
/// `completed_at` and writes `summary`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the job does not exist,
/// [`DbError::InvalidJobTransition`] if the move is not a forward step (or
/// lost a race), or [`DbError::Sqlx`] if a query fails.
pub async fn transition_search_job(
    pool: &PgPool,
    public_id: Uuid,
    to: JobStatus,
    summary: &JobSummary<'_>,
) -> Result<SearchJobRow, DbError> {
    let current = get_search_job(pool, public_id).await?;
    let from = current.job_status()?;

    if !from.can_transition_to(to) {
        return Err(DbError::InvalidJobTransition {
            job_id: public_id,
            from,
            to,
        });
    }

    let row = sqlx::query_as::<_, SearchJobRow>(&format!(
        "UPDATE search_jobs \
         SET status        = $3, \
             started_at    = CASE WHEN $3 = 'running' THEN NOW() ELSE started_at END, \
             completed_at  = CASE WHEN $3 IN ('completed', 'failed') THEN NOW() \
                                  ELSE completed_at END, \
             stores_found  = GREATEST(stores_found, COALESCE($4, stores_found)), \
             credits_used  = GREATEST(credits_used, COALESCE($5, credits_used)), \
             results       = COALESCE($6, results), \
             error_message = COALESCE($7, error_message) \
         WHERE public_id = $1 AND status = $2 \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(public_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(summary.stores_found)
    .bind(summary.credits_used)
    .bind(summary.results)
    .bind(summary.error_message)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::InvalidJobTransition {
        job_id: public_id,
        from,
        to,
    })
}

/// Adds to a running job's counters. Returns `false` (and changes nothing)
/// if the job is not `running`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_job_progress(
    pool: &PgPool,
    public_id: Uuid,
    stores_found_delta: u32,
    credits_used_delta: u32,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE search_jobs \
         SET stores_found = stores_found + $2, \
             credits_used = credits_used + $3 \
         WHERE public_id = $1 AND status = 'running'",
    )
    .bind(public_id)
    .bind(i32::try_from(stores_found_delta).unwrap_or(i32::MAX))
    .bind(i32::try_from(credits_used_delta).unwrap_or(i32::MAX))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetches a single job by public id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_search_job(pool: &PgPool, public_id: Uuid) -> Result<SearchJobRow, DbError> {
    sqlx::query_as::<_, SearchJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM search_jobs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` jobs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_search_jobs(pool: &PgPool, limit: i64) -> Result<Vec<SearchJobRow>, DbError> {
    let rows = sqlx::query_as::<_, SearchJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM search_jobs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts jobs that have not reached a terminal state.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_active_jobs(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM search_jobs WHERE status IN ('pending', 'running')",
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}
