//! Email discovery over a fixed list of stores.

use anyhow::{anyhow, Context};
use dvdscout_db::DbError;
use dvdscout_sources::domain_from_website;
use serde_json::json;
use uuid::Uuid;

use super::{JobOutcome, WorkerContext};

/// Addresses requested per domain; only the best one is kept.
const EMAILS_PER_DOMAIN: u32 = 5;

/// Looks up each store's domain and stores the best address found.
///
/// A lookup that returns at least one address costs one credit. Per-store
/// failures are logged and skipped; a rejected API key fails the job.
pub(super) async fn run(
    ctx: &WorkerContext,
    job_id: Uuid,
    store_ids: &[Uuid],
) -> anyhow::Result<JobOutcome> {
    let provider = ctx
        .sources
        .email
        .as_ref()
        .ok_or_else(|| anyhow!("email discovery provider is not configured"))?;

    let mut processed = 0u32;
    let mut emails_found = 0u32;
    let mut credits_used = 0u32;
    let mut skipped = 0u32;

    for &store_id in store_ids {
        let store = match dvdscout_db::get_store(&ctx.pool, store_id).await {
            Ok(store) => store,
            Err(DbError::NotFound) => {
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e).context("loading store for email discovery"),
        };

        if store.email.as_deref().is_some_and(|e| !e.trim().is_empty()) {
            tracing::debug!(%job_id, %store_id, "store already has an email");
            skipped += 1;
            continue;
        }

        let Some(domain) = store.website.as_deref().and_then(domain_from_website) else {
            tracing::debug!(%job_id, %store_id, "store has no usable website");
            skipped += 1;
            continue;
        };

        if processed > 0 {
            tokio::time::sleep(ctx.sources.email_delay).await;
        }
        processed += 1;

        let emails = match provider.domain_search(&domain, EMAILS_PER_DOMAIN).await {
            Ok(emails) => emails,
            Err(e) if e.is_auth_failure() => {
                return Err(anyhow::Error::new(e).context("email provider rejected the API key"));
            }
            Err(e) => {
                tracing::warn!(%job_id, %store_id, %domain, error = %e, "email lookup failed");
                continue;
            }
        };

        let Some(best) = emails.first() else {
            continue;
        };
        credits_used += 1;
        let confidence = f64::from(best.confidence.min(100)) / 100.0;

        let applied =
            dvdscout_db::apply_discovered_email(&ctx.pool, store_id, &best.value, confidence)
                .await
                .context("saving discovered email")?;
        if applied {
            emails_found += 1;
            tracing::debug!(%job_id, %store_id, %domain, confidence, "email discovered");
        }

        let stores_delta = u32::from(applied);
        if let Err(e) = dvdscout_db::record_job_progress(&ctx.pool, job_id, stores_delta, 1).await {
            tracing::warn!(%job_id, error = %e, "could not record job progress");
        }
    }

    Ok(JobOutcome {
        stores_found: emails_found,
        credits_used,
        results: json!({
            "stores_requested": store_ids.len(),
            "stores_processed": processed,
            "stores_skipped": skipped,
            "emails_found": emails_found,
            "credits_used": credits_used,
        }),
    })
}
