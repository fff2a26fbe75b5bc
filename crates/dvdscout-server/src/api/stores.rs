//! Store CRUD and search handlers.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use dvdscout_core::StoreSource;
use dvdscout_db::stores::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use dvdscout_db::{NewStore, StoreFilters, StoreRow, StoreUpdate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    double_option, empty_as_none, json_body, map_db_error, parse_public_id, query_params,
    ApiError, AppState,
};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub(in crate::api) struct ListStoresQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub skip: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub verified: Option<bool>,
    pub state: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub has_email: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateStoreRequest {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub source: StoreSource,
    pub source_url: Option<String>,
}

// Absent keeps the current value, null clears it, a value sets it.
#[allow(clippy::option_option)]
#[derive(Debug, Default, Deserialize)]
pub(in crate::api) struct UpdateStoreRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl UpdateStoreRequest {
    pub(super) fn as_update(&self) -> StoreUpdate<'_> {
        StoreUpdate {
            name: self.name.as_deref(),
            address: self.address.as_ref().map(Option::as_deref),
            city: self.city.as_ref().map(Option::as_deref),
            state: self.state.as_ref().map(Option::as_deref),
            phone: self.phone.as_ref().map(Option::as_deref),
            website: self.website.as_ref().map(Option::as_deref),
            email: self.email.as_ref().map(Option::as_deref),
            notes: self.notes.as_ref().map(Option::as_deref),
        }
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(in crate::api) struct StoreResponse {
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

impl From<StoreRow> for StoreResponse {
    fn from(row: StoreRow) -> Self {
        Self {
            id: row.public_id,
            name: row.name,
            address: row.address,
            city: row.city,
            state: row.state,
            phone: row.phone,
            website: row.website,
            email: row.email,
            email_confidence: row.email_confidence,
            source: row.source,
            source_url: row.source_url,
            notes: row.notes,
            verified: row.verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct MessageResponse {
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(super) fn normalize_page(
    req_id: &str,
    skip: Option<i64>,
    limit: Option<i64>,
) -> Result<(i64, i64), ApiError> {
    let skip = skip.unwrap_or(0);
    if skip < 0 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("skip must be zero or greater, got {skip}"),
        ));
    }
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    Ok((skip, limit))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/stores: filtered page of stores, newest first.
pub(in crate::api) async fn list_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<ListStoresQuery>, QueryRejection>,
) -> Result<Json<Vec<StoreResponse>>, ApiError> {
    let rid = &req_id.0;
    let params = query_params(rid, query)?;
    let (skip, limit) = normalize_page(rid, params.skip, params.limit)?;

    let filters = StoreFilters {
        search: params.search.as_deref(),
        verified: params.verified,
        state: params.state.as_deref(),
        has_email: params.has_email,
        skip,
        limit,
    };

    let rows = dvdscout_db::search_stores(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(rows.into_iter().map(StoreResponse::from).collect()))
}

/// GET /api/stores/{id}
pub(in crate::api) async fn get_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<StoreResponse>, ApiError> {
    let rid = &req_id.0;
    let id = parse_public_id(rid, &id)?;

    let row = dvdscout_db::get_store(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(row.into()))
}

/// POST /api/stores: create a store; 201 with the stored record.
pub(in crate::api) async fn create_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<CreateStoreRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoreResponse>), ApiError> {
    let rid = &req_id.0;
    let body = json_body(rid, body)?;

    let new_store = NewStore {
        name: body.name,
        address: body.address,
        city: body.city,
        state: body.state,
        phone: body.phone,
        website: body.website,
        email: body.email,
        source: body.source,
        source_url: body.source_url,
        notes: body.notes,
    };

    let row = dvdscout_db::create_store(&state.pool, &new_store)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(store_id = %row.public_id, name = %row.name, source = %row.source, "store created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// PUT /api/stores/{id}: sparse update of editable fields.
pub(in crate::api) async fn update_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStoreRequest>, JsonRejection>,
) -> Result<Json<StoreResponse>, ApiError> {
    let rid = &req_id.0;
    let id = parse_public_id(rid, &id)?;
    let body = json_body(rid, body)?;

    let row = dvdscout_db::update_store(&state.pool, id, &body.as_update())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(store_id = %id, "store updated");
    Ok(Json(row.into()))
}

/// POST /api/stores/{id}/verify
pub(in crate::api) async fn verify_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<StoreResponse>, ApiError> {
    let rid = &req_id.0;
    let id = parse_public_id(rid, &id)?;

    let row = dvdscout_db::verify_store(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(store_id = %id, "store verified");
    Ok(Json(row.into()))
}

/// DELETE /api/stores/{id}
pub(in crate::api) async fn delete_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let rid = &req_id.0;
    let id = parse_public_id(rid, &id)?;

    dvdscout_db::delete_store(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(store_id = %id, "store deleted");
    Ok(Json(MessageResponse {
        message: "Store deleted successfully",
    }))
}
