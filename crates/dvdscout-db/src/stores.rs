//! Database operations for the `stores` table.

use chrono::{DateTime, Utc};
use dvdscout_core::{normalize_optional_text, validate_store_name, StoreSource};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const STORE_COLUMNS: &str = "id, public_id, name, address, city, state, phone, website, email, \
     email_confidence, source, source_url, notes, verified, created_at, updated_at";

/// Default page size for store listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 500;

// ---------------------------------------------------------------------------
// Row and input types
// ---------------------------------------------------------------------------

/// A row from the `stores` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoreRow {
    pub id: i64,
    pub public_id: Uuid,
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

/// Fields accepted when creating a store.
#[derive(Debug, Clone, Default)]
pub struct NewStore {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub source: StoreSource,
    pub source_url: Option<String>,
    pub notes: Option<String>,
}

impl NewStore {
    fn normalized(&self) -> Result<Self, DbError> {
        Ok(Self {
            name: validate_store_name(&self.name)?,
            address: normalize_optional_text(self.address.as_deref()),
            city: normalize_optional_text(self.city.as_deref()),
            state: normalize_optional_text(self.state.as_deref()),
            phone: normalize_optional_text(self.phone.as_deref()),
            website: normalize_optional_text(self.website.as_deref()),
            email: normalize_optional_text(self.email.as_deref()),
            source: self.source,
            source_url: normalize_optional_text(self.source_url.as_deref()),
            notes: normalize_optional_text(self.notes.as_deref()),
        })
    }
}

/// Sparse update of the user-editable store fields.
///
/// For nullable columns: `None` keeps the current value, `Some(None)` clears
/// it, `Some(Some(v))` sets it. `name` cannot be cleared.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct StoreUpdate<'a> {
    pub name: Option<&'a str>,
    pub address: Option<Option<&'a str>>,
    pub city: Option<Option<&'a str>>,
    pub state: Option<Option<&'a str>>,
    pub phone: Option<Option<&'a str>>,
    pub website: Option<Option<&'a str>>,
    pub email: Option<Option<&'a str>>,
    pub notes: Option<Option<&'a str>>,
}

/// Filters and pagination for [`search_stores`].
#[derive(Debug, Clone, Default)]
pub struct StoreFilters<'a> {
    /// Case-insensitive substring matched against name, address, and city.
    pub search: Option<&'a str>,
    pub verified: Option<bool>,
    /// Case-insensitive exact match on `state`.
    pub state: Option<&'a str>,
    pub has_email: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a store and returns the full row.
///
/// The name is trimmed and must be non-empty; blank optional fields are
/// stored as `NULL`.
///
/// # Errors
///
/// Returns [`DbError::Core`] if the name fails validation, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn create_store(pool: &PgPool, store: &NewStore) -> Result<StoreRow, DbError> {
    let store = store.normalized()?;

    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "INSERT INTO stores \
             (public_id, name, address, city, state, phone, website, email, \
              source, source_url, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {STORE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&store.name)
    .bind(&store.address)
    .bind(&store.city)
    .bind(&store.state)
    .bind(&store.phone)
    .bind(&store.website)
    .bind(&store.email)
    .bind(store.source.as_str())
    .bind(&store.source_url)
    .bind(&store.notes)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Inserts a store unless one with the same name (case-insensitive) and city
/// already exists. Returns `None` when the candidate was a duplicate.
///
/// The existence check and insert run as one statement, but two concurrent
/// callers can still both insert; duplicates are tolerated.
///
/// # Errors
///
/// Returns [`DbError::Core`] if the name fails validation, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn insert_store_if_absent(
    pool: &PgPool,
    store: &NewStore,
) -> Result<Option<StoreRow>, DbError> {
    let store = store.normalized()?;

    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "INSERT INTO stores \
             (public_id, name, address, city, state, phone, website, email, \
              source, source_url, notes) \
         SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11 \
         WHERE NOT EXISTS ( \
             SELECT 1 FROM stores \
             WHERE lower(name) = lower($2) AND city IS NOT DISTINCT FROM $4 \
         ) \
         RETURNING {STORE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&store.name)
    .bind(&store.address)
    .bind(&store.city)
    .bind(&store.state)
    .bind(&store.phone)
    .bind(&store.website)
    .bind(&store.email)
    .bind(store.source.as_str())
    .bind(&store.source_url)
    .bind(&store.notes)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Applies a sparse update to the editable fields of a store.
///
/// `public_id`, `source`, and `verified` are never touched. Supplying
/// `email` (set or clear) resets `email_confidence`, marking the email as
/// manually entered.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no store has `public_id`,
/// [`DbError::Core`] if a supplied name is blank, or [`DbError::Sqlx`] if the
/// query fails.
pub async fn update_store(
    pool: &PgPool,
    public_id: Uuid,
    update: &StoreUpdate<'_>,
) -> Result<StoreRow, DbError> {
    let name = update.name.map(validate_store_name).transpose()?;

    // Each nullable column binds a "was supplied" flag and the new value.
    let supplied = |field: Option<Option<&str>>| -> (bool, Option<String>) {
        (field.is_some(), field.and_then(normalize_optional_text))
    };
    let (address_supplied, address) = supplied(update.address);
    let (city_supplied, city) = supplied(update.city);
    let (state_supplied, state) = supplied(update.state);
    let (phone_supplied, phone) = supplied(update.phone);
    let (website_supplied, website) = supplied(update.website);
    let (email_supplied, email) = supplied(update.email);
    let (notes_supplied, notes) = supplied(update.notes);

    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "UPDATE stores \
         SET name       = COALESCE($2, name), \
             address    = CASE WHEN $3::BOOL  THEN $4  ELSE address END, \
             city       = CASE WHEN $5::BOOL  THEN $6  ELSE city END, \
             state      = CASE WHEN $7::BOOL  THEN $8  ELSE state END, \
             phone      = CASE WHEN $9::BOOL  THEN $10 ELSE phone END, \
             website    = CASE WHEN $11::BOOL THEN $12 ELSE website END, \
             email      = CASE WHEN $13::BOOL THEN $14 ELSE email END, \
             email_confidence = CASE WHEN $13::BOOL THEN NULL ELSE email_confidence END, \
             notes      = CASE WHEN $15::BOOL THEN $16 ELSE notes END, \
             updated_at = NOW() \
         WHERE public_id = $1 \
         RETURNING {STORE_COLUMNS}"
    ))
    .bind(public_id)
    .bind(name)
    .bind(address_supplied)
    .bind(address)
    .bind(city_supplied)
    .bind(city)
    .bind(state_supplied)
    .bind(state)
    .bind(phone_supplied)
    .bind(phone)
    .bind(website_supplied)
    .bind(website)
    .bind(email_supplied)
    .bind(email)
    .bind(notes_supplied)
    .bind(notes)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Marks a store as verified. Calling it on an already-verified store
/// changes nothing, including `updated_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no store has `public_id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn verify_store(pool: &PgPool, public_id: Uuid) -> Result<StoreRow, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "UPDATE stores \
         SET updated_at = CASE WHEN verified THEN updated_at ELSE NOW() END, \
             verified   = TRUE \
         WHERE public_id = $1 \
         RETURNING {STORE_COLUMNS}"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Hard-deletes a store.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no store has `public_id` (including a
/// second delete of the same id), or [`DbError::Sqlx`] if the query fails.
pub async fn delete_store(pool: &PgPool, public_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM stores WHERE public_id = $1")
        .bind(public_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Stores an email found by discovery.
///
/// Applies only when the store has no email yet, or when its current email
/// came from discovery with a lower confidence. Manually entered emails are
/// never overwritten. Returns whether the row changed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn apply_discovered_email(
    pool: &PgPool,
    public_id: Uuid,
    email: &str,
    confidence: f64,
) -> Result<bool, DbError> {
    let confidence = confidence.clamp(0.0, 1.0);
    let result = sqlx::query(
        "UPDATE stores \
         SET email = $2, email_confidence = $3, updated_at = NOW() \
         WHERE public_id = $1 \
           AND (COALESCE(email, '') = '' \
                OR (email_confidence IS NOT NULL AND email_confidence < $3))",
    )
    .bind(public_id)
    .bind(email)
    .bind(confidence)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetches a single store by its public id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_store(pool: &PgPool, public_id: Uuid) -> Result<StoreRow, DbError> {
    sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} FROM stores WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns one page of stores matching `filters`, newest first.
///
/// `skip` past the end yields an empty page. `limit` is clamped to
/// `1..=MAX_PAGE_SIZE` and negative `skip` is treated as zero.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_stores(
    pool: &PgPool,
    filters: &StoreFilters<'_>,
) -> Result<Vec<StoreRow>, DbError> {
    let pattern = filters
        .search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));
    let state = filters.state.map(str::trim).filter(|s| !s.is_empty());
    let limit = if filters.limit <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        filters.limit.min(MAX_PAGE_SIZE)
    };

    let rows = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} \
         FROM stores \
         WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR address ILIKE $1 OR city ILIKE $1) \
           AND ($2::BOOL IS NULL OR verified = $2) \
           AND ($3::TEXT IS NULL OR lower(state) = lower($3)) \
           AND ($4::BOOL IS NULL OR (COALESCE(email, '') <> '') = $4) \
         ORDER BY created_at DESC, id DESC \
         OFFSET $5 \
         LIMIT $6"
    ))
    .bind(pattern)
    .bind(filters.verified)
    .bind(state)
    .bind(filters.has_email)
    .bind(filters.skip.max(0))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns ids of stores that have a website but no email, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_store_ids_missing_email(pool: &PgPool, limit: i64) -> Result<Vec<Uuid>, DbError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT public_id FROM stores \
         WHERE COALESCE(email, '') = '' AND COALESCE(website, '') <> '' \
         ORDER BY created_at, id \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Escapes `LIKE` metacharacters so user text matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
