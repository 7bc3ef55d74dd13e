use sqlx::PgPool;

use super::map_db_error;
use crate::domain::Property;
use crate::error::AppResult;

const COLUMNS: &str = "id, landlord_id, name, address, room_count, created_at, updated_at";

pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Property>> {
    sqlx::query_as::<_, Property>(&format!("SELECT {COLUMNS} FROM properties WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)
}

pub async fn list_by_landlord(pool: &PgPool, landlord_id: i64) -> AppResult<Vec<Property>> {
    sqlx::query_as::<_, Property>(&format!(
        "SELECT {COLUMNS} FROM properties WHERE landlord_id = $1 ORDER BY id"
    ))
    .bind(landlord_id)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}

pub async fn insert(
    pool: &PgPool,
    landlord_id: i64,
    name: &str,
    address: Option<&str>,
) -> AppResult<Property> {
    sqlx::query_as::<_, Property>(&format!(
        "INSERT INTO properties (landlord_id, name, address) \
         VALUES ($1, $2, $3) RETURNING {COLUMNS}"
    ))
    .bind(landlord_id)
    .bind(name)
    .bind(address)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    name: Option<&str>,
    address: Option<&str>,
) -> AppResult<Property> {
    sqlx::query_as::<_, Property>(&format!(
        "UPDATE properties SET \
            name = COALESCE($2, name), \
            address = COALESCE($3, address), \
            updated_at = now() \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(address)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn delete(pool: &PgPool, id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

pub async fn room_count(pool: &PgPool, property_id: i64) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM rooms WHERE property_id = $1")
        .bind(property_id)
        .fetch_one(pool)
        .await
        .map_err(map_db_error)
}

pub async fn sync_room_count(pool: &PgPool, property_id: i64) -> AppResult<()> {
    sqlx::query(
        "UPDATE properties SET room_count = \
            (SELECT count(*) FROM rooms WHERE property_id = $1), \
            updated_at = now() \
         WHERE id = $1",
    )
    .bind(property_id)
    .execute(pool)
    .await
    .map_err(map_db_error)?;
    Ok(())
}
