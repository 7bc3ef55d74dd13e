use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use super::map_db_error;
use crate::domain::MeterReading;
use crate::error::AppResult;

const COLUMNS: &str = "id, room_id, reading_month, water_reading, electricity_reading, \
    prev_water_reading, prev_electricity_reading, water_usage, electricity_usage, \
    reading_date, images, created_at";

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct ReadingRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub reading: MeterReading,
    pub room_name: String,
    pub property_name: String,
}

pub struct NewReading<'a> {
    pub room_id: i64,
    pub reading_month: &'a str,
    pub water_reading: Decimal,
    pub electricity_reading: Decimal,
    pub prev_water_reading: Decimal,
    pub prev_electricity_reading: Decimal,
    pub water_usage: Decimal,
    pub electricity_usage: Decimal,
    pub reading_date: NaiveDate,
    pub images: &'a [String],
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<MeterReading>> {
    sqlx::query_as::<_, MeterReading>(&format!(
        "SELECT {COLUMNS} FROM meter_readings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

pub async fn exists_for_month(
    pool: &PgPool,
    room_id: i64,
    month: &str,
    exclude_id: Option<i64>,
) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM meter_readings \
         WHERE room_id = $1 AND reading_month = $2 AND ($3::bigint IS NULL OR id <> $3)",
    )
    .bind(room_id)
    .bind(month)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)?;
    Ok(count > 0)
}

/// The latest reading strictly before `month`, by month order.
pub async fn latest_before(
    pool: &PgPool,
    room_id: i64,
    month: &str,
) -> AppResult<Option<MeterReading>> {
    sqlx::query_as::<_, MeterReading>(&format!(
        "SELECT {COLUMNS} FROM meter_readings \
         WHERE room_id = $1 AND reading_month < $2 \
         ORDER BY reading_month DESC LIMIT 1"
    ))
    .bind(room_id)
    .bind(month)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

pub async fn find_for_month(
    pool: &PgPool,
    room_id: i64,
    month: &str,
) -> AppResult<Option<MeterReading>> {
    sqlx::query_as::<_, MeterReading>(&format!(
        "SELECT {COLUMNS} FROM meter_readings \
         WHERE room_id = $1 AND reading_month = $2"
    ))
    .bind(room_id)
    .bind(month)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

/// The highest recorded month for a room. `YYYY-MM` sorts as text.
pub async fn latest_month(
    executor: impl PgExecutor<'_>,
    room_id: i64,
) -> AppResult<Option<String>> {
    sqlx::query_scalar::<_, Option<String>>(
        "SELECT max(reading_month) FROM meter_readings WHERE room_id = $1",
    )
    .bind(room_id)
    .fetch_one(executor)
    .await
    .map_err(map_db_error)
}

pub async fn latest_for_room(pool: &PgPool, room_id: i64) -> AppResult<Option<MeterReading>> {
    sqlx::query_as::<_, MeterReading>(&format!(
        "SELECT {COLUMNS} FROM meter_readings \
         WHERE room_id = $1 ORDER BY reading_month DESC LIMIT 1"
    ))
    .bind(room_id)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

pub async fn insert(
    executor: impl PgExecutor<'_>,
    reading: NewReading<'_>,
) -> AppResult<MeterReading> {
    sqlx::query_as::<_, MeterReading>(&format!(
        "INSERT INTO meter_readings (room_id, reading_month, water_reading, \
            electricity_reading, prev_water_reading, prev_electricity_reading, \
            water_usage, electricity_usage, reading_date, images) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {COLUMNS}"
    ))
    .bind(reading.room_id)
    .bind(reading.reading_month)
    .bind(reading.water_reading)
    .bind(reading.electricity_reading)
    .bind(reading.prev_water_reading)
    .bind(reading.prev_electricity_reading)
    .bind(reading.water_usage)
    .bind(reading.electricity_usage)
    .bind(reading.reading_date)
    .bind(Json(reading.images))
    .fetch_one(executor)
    .await
    .map_err(map_db_error)
}

/// Month and the previous-reading snapshot never change on update.
pub async fn update(
    executor: impl PgExecutor<'_>,
    id: i64,
    water_reading: Decimal,
    electricity_reading: Decimal,
    water_usage: Decimal,
    electricity_usage: Decimal,
    reading_date: Option<NaiveDate>,
    images: Option<&[String]>,
) -> AppResult<MeterReading> {
    sqlx::query_as::<_, MeterReading>(&format!(
        "UPDATE meter_readings SET \
            water_reading = $2, electricity_reading = $3, \
            water_usage = $4, electricity_usage = $5, \
            reading_date = COALESCE($6, reading_date), \
            images = COALESCE($7, images) \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(water_reading)
    .bind(electricity_reading)
    .bind(water_usage)
    .bind(electricity_usage)
    .bind(reading_date)
    .bind(images.map(Json))
    .fetch_one(executor)
    .await
    .map_err(map_db_error)
}

pub async fn delete(pool: &PgPool, id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM meter_readings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

pub async fn list_by_month(
    pool: &PgPool,
    landlord_id: i64,
    month: &str,
) -> AppResult<Vec<ReadingRow>> {
    sqlx::query_as::<_, ReadingRow>(
        "SELECT m.*, r.room_name, p.name AS property_name \
         FROM meter_readings m \
         JOIN rooms r ON r.id = m.room_id \
         JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = $1 AND m.reading_month = $2 \
         ORDER BY p.name, r.room_name",
    )
    .bind(landlord_id)
    .bind(month)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}

pub async fn page(
    pool: &PgPool,
    landlord_id: i64,
    room_id: Option<i64>,
    month: Option<&str>,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<ReadingRow>, i64)> {
    let mut count_qb = QueryBuilder::<Postgres>::new(
        "SELECT count(*) FROM meter_readings m \
         JOIN rooms r ON r.id = m.room_id \
         JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = ",
    );
    push_reading_filters(&mut count_qb, landlord_id, room_id, month);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(map_db_error)?;

    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT m.*, r.room_name, p.name AS property_name \
         FROM meter_readings m \
         JOIN rooms r ON r.id = m.room_id \
         JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = ",
    );
    push_reading_filters(&mut qb, landlord_id, room_id, month);
    qb.push(" ORDER BY m.reading_month DESC, m.id DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    let records = qb
        .build_query_as::<ReadingRow>()
        .fetch_all(pool)
        .await
        .map_err(map_db_error)?;
    Ok((records, total))
}

fn push_reading_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    landlord_id: i64,
    room_id: Option<i64>,
    month: Option<&str>,
) {
    qb.push_bind(landlord_id);
    if let Some(room_id) = room_id {
        qb.push(" AND m.room_id = ");
        qb.push_bind(room_id);
    }
    if let Some(month) = month.filter(|value| !value.trim().is_empty()) {
        qb.push(" AND m.reading_month = ");
        qb.push_bind(month.trim().to_string());
    }
}
