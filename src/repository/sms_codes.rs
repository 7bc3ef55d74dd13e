use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::map_db_error;
use crate::error::AppResult;

pub async fn upsert(
    pool: &PgPool,
    phone: &str,
    purpose: &str,
    code: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO sms_codes (phone, purpose, code, expires_at) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (phone, purpose) \
         DO UPDATE SET code = EXCLUDED.code, expires_at = EXCLUDED.expires_at",
    )
    .bind(phone)
    .bind(purpose)
    .bind(code)
    .bind(expires_at)
    .execute(pool)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

/// Deletes the matching unexpired code. Returns whether one was consumed.
pub async fn consume(pool: &PgPool, phone: &str, purpose: &str, code: &str) -> AppResult<bool> {
    let result = sqlx::query(
        "DELETE FROM sms_codes \
         WHERE phone = $1 AND purpose = $2 AND code = $3 AND expires_at > now()",
    )
    .bind(phone)
    .bind(purpose)
    .bind(code)
    .execute(pool)
    .await
    .map_err(map_db_error)?;
    Ok(result.rows_affected() > 0)
}
