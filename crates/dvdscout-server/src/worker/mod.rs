//! Background ingestion workers.
//!
//! Handlers create a `pending` job row and push a [`JobRequest`] onto the
//! [`JobQueue`]. A single dispatcher task drains the queue and spawns one
//! task per job, so launching never blocks the request. Each task moves its
//! job to `running`, does the work, and makes exactly one terminal
//! transition.

mod directory;
mod emails;
mod reddit;

use std::sync::Arc;
use std::time::Duration;

use dvdscout_core::{AppConfig, JobStatus, JobType};
use dvdscout_db::{JobSummary, NewStore};
use dvdscout_sources::{
    CandidateStore, EmailProvider, HttpSettings, HunterClient, ListingQuery, ListingSource,
    RedditSource, YellowPagesSource, YelpSource,
};
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Work attached to a queued job.
#[derive(Debug, Clone)]
pub enum JobKind {
    Directory(ListingQuery),
    Reddit(ListingQuery),
    Emails { store_ids: Vec<Uuid> },
}

#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: Uuid,
    pub kind: JobKind,
}

/// The dispatcher has stopped; no further jobs can run.
#[derive(Debug, thiserror::Error)]
#[error("job queue is closed")]
pub struct QueueClosed;

/// Sending half of the job queue; cheap to clone into handler state.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<JobRequest>,
}

impl JobQueue {
    /// Hands a job to the dispatcher. Never waits.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the dispatcher is gone.
    pub fn enqueue(&self, request: JobRequest) -> Result<(), QueueClosed> {
        self.tx.send(request).map_err(|_| QueueClosed)
    }

    /// A queue with no dispatcher; the caller inspects what was enqueued.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<JobRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// External collaborators the workers call.
pub struct Sources {
    pub directories: Vec<Arc<dyn ListingSource>>,
    pub forum: Arc<dyn ListingSource>,
    /// `None` when no provider key is configured.
    pub email: Option<Arc<dyn EmailProvider>>,
    /// Pause between per-store email lookups.
    pub email_delay: Duration,
}

impl Sources {
    /// Builds the production sources from config.
    ///
    /// # Errors
    ///
    /// Returns an error if any HTTP client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let settings = HttpSettings::from_app_config(config);

        let email: Option<Arc<dyn EmailProvider>> = match config.hunter_api_key.as_deref() {
            Some(key) => Some(Arc::new(HunterClient::with_base_url(
                key,
                config.scraper_request_timeout_secs,
                &config.hunter_base_url,
            )?)),
            None => {
                tracing::warn!("HUNTER_API_KEY not set; email discovery disabled");
                None
            }
        };

        Ok(Self {
            directories: vec![
                Arc::new(YellowPagesSource::new(settings.clone())?),
                Arc::new(YelpSource::new(settings.clone())?),
            ],
            forum: Arc::new(RedditSource::new(settings.clone())?),
            email,
            email_delay: settings.inter_request_delay,
        })
    }
}

/// What a job reports on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct JobOutcome {
    pub stores_found: u32,
    pub credits_used: u32,
    pub results: Value,
}

/// Shared state for every job task.
pub(crate) struct WorkerContext {
    pub pool: PgPool,
    pub sources: Arc<Sources>,
}

/// Starts the dispatcher and returns the queue feeding it.
///
/// The dispatcher exits once every [`JobQueue`] clone is dropped. Jobs
/// already spawned keep running.
pub fn spawn_dispatcher(pool: PgPool, sources: Arc<Sources>) -> (JobQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<JobRequest>();
    let ctx = Arc::new(WorkerContext { pool, sources });

    let handle = tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(run_job(ctx, request));
        }
        tracing::info!("job queue closed, dispatcher stopping");
    });

    (JobQueue { tx }, handle)
}

/// Drives one job from `pending` to a terminal state.
///
/// Returns the terminal status that was recorded, or `None` when the job
/// could not be claimed or its final state could not be written. A job that
/// fails the `pending` to `running` claim (missing row, already claimed, or
/// a database error) is not retried and stays in whatever state it had.
pub(crate) async fn run_job(ctx: Arc<WorkerContext>, request: JobRequest) -> Option<JobStatus> {
    let job_id = request.job_id;
    let job_type = request.kind.job_type();

    if let Err(e) = dvdscout_db::transition_search_job(
        &ctx.pool,
        job_id,
        JobStatus::Running,
        &JobSummary::default(),
    )
    .await
    {
        tracing::warn!(
            %job_id,
            kind = %job_type,
            error = %e,
            "could not claim job; it will not run and stays in its current state"
        );
        return None;
    }
    tracing::info!(%job_id, kind = %job_type, "job started");

    let outcome = match request.kind {
        JobKind::Directory(query) => directory::run(&ctx, job_id, &query).await,
        JobKind::Reddit(query) => reddit::run(&ctx, job_id, &query).await,
        JobKind::Emails { store_ids } => emails::run(&ctx, job_id, &store_ids).await,
    };

    let finished = match outcome {
        Ok(outcome) => {
            let summary = JobSummary {
                stores_found: Some(saturating_i32(outcome.stores_found)),
                credits_used: Some(saturating_i32(outcome.credits_used)),
                results: Some(&outcome.results),
                error_message: None,
            };
            let result =
                dvdscout_db::transition_search_job(&ctx.pool, job_id, JobStatus::Completed, &summary)
                    .await;
            if result.is_ok() {
                tracing::info!(
                    %job_id,
                    stores_found = outcome.stores_found,
                    credits_used = outcome.credits_used,
                    "job completed"
                );
            }
            result
        }
        Err(e) => {
            let message = format!("{e:#}");
            tracing::warn!(%job_id, error = %message, "job failed");
            let summary = JobSummary {
                error_message: Some(&message),
                ..JobSummary::default()
            };
            dvdscout_db::transition_search_job(&ctx.pool, job_id, JobStatus::Failed, &summary).await
        }
    };

    match finished {
        Ok(row) => row.job_status().ok(),
        Err(e) => {
            tracing::error!(%job_id, error = %e, "could not record terminal job state");
            None
        }
    }
}

impl JobKind {
    #[must_use]
    pub fn job_type(&self) -> JobType {
        match self {
            JobKind::Directory(_) => JobType::DirectorySearch,
            JobKind::Reddit(_) => JobType::RedditSearch,
            JobKind::Emails { .. } => JobType::EmailDiscovery,
        }
    }
}

/// Inserts candidates that are not already known, bumping the job's live
/// `stores_found` after each insert. Returns `(inserted, duplicates)`.
pub(crate) async fn persist_candidates(
    ctx: &WorkerContext,
    job_id: Uuid,
    candidates: Vec<CandidateStore>,
) -> (u32, u32) {
    let mut inserted = 0u32;
    let mut duplicates = 0u32;

    for candidate in candidates {
        let name = candidate.name.clone();
        match dvdscout_db::insert_store_if_absent(&ctx.pool, &candidate_to_new_store(candidate)).await {
            Ok(Some(row)) => {
                inserted += 1;
                tracing::debug!(%job_id, store_id = %row.public_id, name = %row.name, "store added");
                if let Err(e) = dvdscout_db::record_job_progress(&ctx.pool, job_id, 1, 0).await {
                    tracing::warn!(%job_id, error = %e, "could not record job progress");
                }
            }
            Ok(None) => duplicates += 1,
            Err(e) => tracing::warn!(%job_id, name = %name, error = %e, "skipping candidate"),
        }
    }

    (inserted, duplicates)
}

fn candidate_to_new_store(candidate: CandidateStore) -> NewStore {
    NewStore {
        name: candidate.name,
        address: candidate.address,
        city: candidate.city,
        state: candidate.state,
        phone: candidate.phone,
        website: candidate.website,
        email: None,
        source: candidate.source,
        source_url: candidate.source_url,
        notes: candidate.notes,
    }
}

fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;
