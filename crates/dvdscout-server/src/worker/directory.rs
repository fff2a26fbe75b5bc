//! Directory search: every configured directory gets half the budget.

use anyhow::bail;
use dvdscout_sources::ListingQuery;
use serde_json::{json, Map};
use uuid::Uuid;

use super::{persist_candidates, JobOutcome, WorkerContext};

/// Queries each directory in turn. A failing directory is logged and
/// recorded in the results; the job fails only if all of them fail.
pub(super) async fn run(
    ctx: &WorkerContext,
    job_id: Uuid,
    query: &ListingQuery,
) -> anyhow::Result<JobOutcome> {
    let directories = &ctx.sources.directories;
    if directories.is_empty() {
        bail!("no directory sources are configured");
    }

    let per_source = ListingQuery {
        max_results: query.max_results / 2,
        ..query.clone()
    };

    let mut per_source_results = Map::new();
    let mut failures = Vec::new();
    let mut stores_found = 0u32;
    let mut duplicates = 0u32;

    for source in directories {
        match source.search(&per_source).await {
            Ok(candidates) => {
                let candidates_seen = candidates.len();
                let (inserted, skipped) = persist_candidates(ctx, job_id, candidates).await;
                stores_found += inserted;
                duplicates += skipped;
                per_source_results.insert(
                    source.name().to_owned(),
                    json!({ "candidates": candidates_seen, "inserted": inserted }),
                );
            }
            Err(e) => {
                tracing::warn!(%job_id, source = source.name(), error = %e, "directory source failed");
                per_source_results.insert(source.name().to_owned(), json!({ "error": e.to_string() }));
                failures.push(format!("{}: {e}", source.name()));
            }
        }
    }

    if failures.len() == directories.len() {
        bail!("all directory sources failed ({})", failures.join("; "));
    }

    Ok(JobOutcome {
        stores_found,
        credits_used: 0,
        results: json!({
            "query": query.query,
            "location": query.location,
            "stores_found": stores_found,
            "duplicates_skipped": duplicates,
            "sources": per_source_results,
        }),
    })
}
