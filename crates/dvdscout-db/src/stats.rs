//! Aggregate counts for the dashboard.

use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct StoreCounts {
    pub total_stores: i64,
    pub verified_stores: i64,
    pub stores_with_emails: i64,
}

/// Counts all stores, verified stores, and stores with a non-empty email in
/// one scan.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn store_counts(pool: &PgPool) -> Result<StoreCounts, DbError> {
    let counts = sqlx::query_as::<_, StoreCounts>(
        "SELECT \
             COUNT(*) AS total_stores, \
             COUNT(*) FILTER (WHERE verified) AS verified_stores, \
             COUNT(*) FILTER (WHERE COALESCE(email, '') <> '') AS stores_with_emails \
         FROM stores",
    )
    .fetch_one(pool)
    .await?;

    Ok(counts)
}
