use anyhow::Context;
use dvdscout_sources::ListingQuery;
use serde_json::json;
use uuid::Uuid;

use super::{persist_candidates, JobOutcome, WorkerContext};

/// Forum search. Any source error fails the job.
pub(super) async fn run(
    ctx: &WorkerContext,
    job_id: Uuid,
    query: &ListingQuery,
) -> anyhow::Result<JobOutcome> {
    let forum = &ctx.sources.forum;
    let candidates = forum
        .search(query)
        .await
        .with_context(|| format!("{} search failed", forum.name()))?;

    let candidates_seen = candidates.len();
    let (stores_found, duplicates) = persist_candidates(ctx, job_id, candidates).await;

    Ok(JobOutcome {
        stores_found,
        credits_used: 0,
        results: json!({
            "query": query.query,
            "max_posts": query.max_results,
            "candidates": candidates_seen,
            "stores_found": stores_found,
            "duplicates_skipped": duplicates,
        }),
    })
}
