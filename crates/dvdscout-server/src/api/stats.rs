use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::jobs::JobResponse;
use super::{map_db_error, ApiError, AppState};

const RECENT_JOBS: i64 = 5;

#[derive(Debug, Serialize)]
pub(in crate::api) struct StatsResponse {
    pub total_stores: i64,
    pub verified_stores: i64,
    pub stores_with_emails: i64,
    /// `null` when the provider is unreachable or not configured.
    pub credits_remaining: Option<i64>,
    pub active_jobs: i64,
    pub recent_jobs: Vec<JobResponse>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ProviderAccountResponse {
    pub credits_remaining: i64,
    pub plan_name: String,
}

/// GET /api/stats
///
/// A failing provider lookup only blanks `credits_remaining`.
pub(in crate::api) async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<StatsResponse>, ApiError> {
    let rid = &req_id.0;

    let counts = dvdscout_db::store_counts(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let active_jobs = dvdscout_db::count_active_jobs(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let recent_jobs = dvdscout_db::list_search_jobs(&state.pool, RECENT_JOBS)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let credits_remaining = match &state.email_provider {
        Some(provider) => match provider.account().await {
            Ok(account) => Some(account.credits_remaining),
            Err(e) => {
                tracing::warn!(error = %e, "stats: email provider unavailable");
                None
            }
        },
        None => None,
    };

    Ok(Json(StatsResponse {
        total_stores: counts.total_stores,
        verified_stores: counts.verified_stores,
        stores_with_emails: counts.stores_with_emails,
        credits_remaining,
        active_jobs,
        recent_jobs: recent_jobs.into_iter().map(JobResponse::from).collect(),
    }))
}

/// GET /api/provider/account
pub(in crate::api) async fn get_provider_account(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ProviderAccountResponse>, ApiError> {
    let rid = &req_id.0;

    let Some(provider) = &state.email_provider else {
        return Err(ApiError::new(
            rid,
            "service_unavailable",
            "email provider is not configured",
        ));
    };

    let account = provider.account().await.map_err(|e| {
        tracing::warn!(error = %e, "provider account lookup failed");
        ApiError::new(rid, "external_service_error", e.to_string())
    })?;

    Ok(Json(ProviderAccountResponse {
        credits_remaining: account.credits_remaining,
        plan_name: account.plan_name,
    }))
}
