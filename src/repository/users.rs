use sqlx::PgPool;

use super::map_db_error;
use crate::domain::{User, UserRole};
use crate::error::AppResult;

const COLUMNS: &str =
    "id, phone, password, name, user_type, status, last_login_at, created_at, updated_at";

pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)
}

pub async fn find_by_phone(pool: &PgPool, phone: &str) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE phone = $1"))
        .bind(phone)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)
}

pub async fn insert(
    pool: &PgPool,
    phone: &str,
    password_hash: Option<&str>,
    name: &str,
    role: UserRole,
) -> AppResult<User> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (phone, password, name, user_type, status) \
         VALUES ($1, $2, $3, $4, 1) RETURNING {COLUMNS}"
    ))
    .bind(phone)
    .bind(password_hash)
    .bind(name)
    .bind(role.code())
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn touch_last_login(pool: &PgPool, id: i64) -> AppResult<()> {
    sqlx::query("UPDATE users SET last_login_at = now(), updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    Ok(())
}
