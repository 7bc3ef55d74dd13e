use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use super::map_db_error;
use crate::domain::{FeeLine, Room};
use crate::error::AppResult;

const COLUMNS: &str = "id, property_id, room_name, status, tenant_id, tenant_phone, \
    rent_start_date, monthly_rent, cleaning_fee, water_price, electricity_price, \
    other_fees, last_water_reading, last_electricity_reading, remark, created_at, updated_at";

/// A room plus the landlord that owns it, resolved through the property.
#[derive(Debug, sqlx::FromRow)]
pub struct OwnedRoom {
    #[sqlx(flatten)]
    pub room: Room,
    pub landlord_id: i64,
}

/// Page row with the joined names the directory screens show.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct RoomRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub room: Room,
    pub property_name: String,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct RoomOption {
    pub id: i64,
    pub room_name: String,
    pub property_name: String,
    pub status: i16,
}

pub struct NewRoom<'a> {
    pub property_id: i64,
    pub room_name: &'a str,
    pub monthly_rent: Decimal,
    pub cleaning_fee: Option<Decimal>,
    pub water_price: Option<Decimal>,
    pub electricity_price: Option<Decimal>,
    pub other_fees: &'a [FeeLine],
    pub remark: Option<&'a str>,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Room>> {
    sqlx::query_as::<_, Room>(&format!("SELECT {COLUMNS} FROM rooms WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)
}

pub async fn find_with_landlord(pool: &PgPool, id: i64) -> AppResult<Option<OwnedRoom>> {
    sqlx::query_as::<_, OwnedRoom>(
        "SELECT r.*, p.landlord_id FROM rooms r \
         JOIN properties p ON p.id = r.property_id \
         WHERE r.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

pub async fn name_exists(
    pool: &PgPool,
    property_id: i64,
    room_name: &str,
    exclude_id: Option<i64>,
) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM rooms \
         WHERE property_id = $1 AND room_name = $2 AND ($3::bigint IS NULL OR id <> $3)",
    )
    .bind(property_id)
    .bind(room_name)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)?;
    Ok(count > 0)
}

pub async fn insert(pool: &PgPool, room: NewRoom<'_>) -> AppResult<Room> {
    sqlx::query_as::<_, Room>(&format!(
        "INSERT INTO rooms (property_id, room_name, status, monthly_rent, cleaning_fee, \
            water_price, electricity_price, other_fees, remark) \
         VALUES ($1, $2, 1, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
    ))
    .bind(room.property_id)
    .bind(room.room_name)
    .bind(room.monthly_rent)
    .bind(room.cleaning_fee)
    .bind(room.water_price)
    .bind(room.electricity_price)
    .bind(Json(room.other_fees))
    .bind(room.remark)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    room_name: Option<&str>,
    status: Option<i16>,
    remark: Option<&str>,
) -> AppResult<Room> {
    sqlx::query_as::<_, Room>(&format!(
        "UPDATE rooms SET \
            room_name = COALESCE($2, room_name), \
            status = COALESCE($3, status), \
            remark = COALESCE($4, remark), \
            updated_at = now() \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(room_name)
    .bind(status)
    .bind(remark)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn update_fees(
    pool: &PgPool,
    id: i64,
    monthly_rent: Option<Decimal>,
    cleaning_fee: Option<Decimal>,
    water_price: Option<Decimal>,
    electricity_price: Option<Decimal>,
    other_fees: Option<&[FeeLine]>,
) -> AppResult<Room> {
    sqlx::query_as::<_, Room>(&format!(
        "UPDATE rooms SET \
            monthly_rent = COALESCE($2, monthly_rent), \
            cleaning_fee = COALESCE($3, cleaning_fee), \
            water_price = COALESCE($4, water_price), \
            electricity_price = COALESCE($5, electricity_price), \
            other_fees = COALESCE($6, other_fees), \
            updated_at = now() \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(monthly_rent)
    .bind(cleaning_fee)
    .bind(water_price)
    .bind(electricity_price)
    .bind(other_fees.map(Json))
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn bind_tenant(
    pool: &PgPool,
    id: i64,
    tenant_id: i64,
    tenant_phone: &str,
    rent_start_date: Option<NaiveDate>,
) -> AppResult<Room> {
    sqlx::query_as::<_, Room>(&format!(
        "UPDATE rooms SET status = 2, tenant_id = $2, tenant_phone = $3, \
            rent_start_date = $4, updated_at = now() \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(tenant_id)
    .bind(tenant_phone)
    .bind(rent_start_date)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn unbind_tenant(pool: &PgPool, id: i64) -> AppResult<Room> {
    sqlx::query_as::<_, Room>(&format!(
        "UPDATE rooms SET status = 1, tenant_id = NULL, tenant_phone = NULL, \
            rent_start_date = NULL, updated_at = now() \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn update_status(pool: &PgPool, id: i64, status: i16) -> AppResult<()> {
    sqlx::query("UPDATE rooms SET status = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

/// Rolls the room's last-known meter snapshot forward after a reading write.
pub async fn update_last_readings(
    executor: impl PgExecutor<'_>,
    id: i64,
    water: Decimal,
    electricity: Decimal,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE rooms SET last_water_reading = $2, last_electricity_reading = $3, \
            updated_at = now() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(water)
    .bind(electricity)
    .execute(executor)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM rooms WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

pub async fn page(
    pool: &PgPool,
    landlord_id: i64,
    property_id: Option<i64>,
    status: Option<i16>,
    keyword: Option<&str>,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<RoomRow>, i64)> {
    let mut count_qb = QueryBuilder::<Postgres>::new(
        "SELECT count(*) FROM rooms r JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = ",
    );
    push_room_filters(&mut count_qb, landlord_id, property_id, status, keyword);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(map_db_error)?;

    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT r.*, p.name AS property_name \
         FROM rooms r JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = ",
    );
    push_room_filters(&mut qb, landlord_id, property_id, status, keyword);
    qb.push(" ORDER BY r.id DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    let records = qb
        .build_query_as::<RoomRow>()
        .fetch_all(pool)
        .await
        .map_err(map_db_error)?;
    Ok((records, total))
}

fn push_room_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    landlord_id: i64,
    property_id: Option<i64>,
    status: Option<i16>,
    keyword: Option<&str>,
) {
    qb.push_bind(landlord_id);
    if let Some(property_id) = property_id {
        qb.push(" AND r.property_id = ");
        qb.push_bind(property_id);
    }
    if let Some(status) = status {
        qb.push(" AND r.status = ");
        qb.push_bind(status);
    }
    if let Some(keyword) = keyword.filter(|value| !value.trim().is_empty()) {
        qb.push(" AND (r.room_name ILIKE ");
        qb.push_bind(format!("%{}%", keyword.trim()));
        qb.push(" OR r.tenant_phone ILIKE ");
        qb.push_bind(format!("%{}%", keyword.trim()));
        qb.push(")");
    }
}

pub async fn options(pool: &PgPool, landlord_id: i64) -> AppResult<Vec<RoomOption>> {
    sqlx::query_as::<_, RoomOption>(
        "SELECT r.id, r.room_name, p.name AS property_name, r.status \
         FROM rooms r JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = $1 ORDER BY p.name, r.room_name",
    )
    .bind(landlord_id)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}
