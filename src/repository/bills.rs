use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use super::map_db_error;
use crate::domain::{Bill, FeeLine};
use crate::error::AppResult;

const COLUMNS: &str = "id, bill_no, room_id, tenant_id, bill_month, meter_reading_id, \
    rent_amount, water_amount, electricity_amount, cleaning_amount, other_details, \
    total_amount, status, paid_amount, paid_at, payment_method, remark, created_at, updated_at";

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct BillRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub bill: Bill,
    pub room_name: String,
    pub property_name: String,
}

#[derive(Debug, Default, sqlx::FromRow, Serialize)]
pub struct BillStatistics {
    pub total_count: i64,
    pub pending_count: i64,
    pub paid_count: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
}

pub struct NewBill<'a> {
    pub bill_no: &'a str,
    pub room_id: i64,
    pub tenant_id: i64,
    pub bill_month: &'a str,
    pub meter_reading_id: Option<i64>,
    pub rent_amount: Decimal,
    pub water_amount: Decimal,
    pub electricity_amount: Decimal,
    pub cleaning_amount: Decimal,
    pub other_details: &'a [FeeLine],
    pub total_amount: Decimal,
    pub remark: Option<&'a str>,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Bill>> {
    sqlx::query_as::<_, Bill>(&format!("SELECT {COLUMNS} FROM bills WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)
}

pub async fn find_row_by_id(pool: &PgPool, id: i64) -> AppResult<Option<BillRow>> {
    sqlx::query_as::<_, BillRow>(
        "SELECT b.*, r.room_name, p.name AS property_name \
         FROM bills b \
         JOIN rooms r ON r.id = b.room_id \
         JOIN properties p ON p.id = r.property_id \
         WHERE b.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

pub async fn find_by_room_month(
    executor: impl PgExecutor<'_>,
    room_id: i64,
    month: &str,
) -> AppResult<Option<Bill>> {
    sqlx::query_as::<_, Bill>(&format!(
        "SELECT {COLUMNS} FROM bills WHERE room_id = $1 AND bill_month = $2"
    ))
    .bind(room_id)
    .bind(month)
    .fetch_optional(executor)
    .await
    .map_err(map_db_error)
}

pub async fn insert(executor: impl PgExecutor<'_>, bill: NewBill<'_>) -> AppResult<Bill> {
    sqlx::query_as::<_, Bill>(&format!(
        "INSERT INTO bills (bill_no, room_id, tenant_id, bill_month, meter_reading_id, \
            rent_amount, water_amount, electricity_amount, cleaning_amount, other_details, \
            total_amount, status, paid_amount, remark) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1, 0, $12) \
         RETURNING {COLUMNS}"
    ))
    .bind(bill.bill_no)
    .bind(bill.room_id)
    .bind(bill.tenant_id)
    .bind(bill.bill_month)
    .bind(bill.meter_reading_id)
    .bind(bill.rent_amount)
    .bind(bill.water_amount)
    .bind(bill.electricity_amount)
    .bind(bill.cleaning_amount)
    .bind(Json(bill.other_details))
    .bind(bill.total_amount)
    .bind(bill.remark)
    .fetch_one(executor)
    .await
    .map_err(map_db_error)
}

pub async fn update_amounts(
    pool: &PgPool,
    id: i64,
    rent_amount: Decimal,
    other_details: &[FeeLine],
    total_amount: Decimal,
    remark: Option<&str>,
) -> AppResult<Bill> {
    sqlx::query_as::<_, Bill>(&format!(
        "UPDATE bills SET rent_amount = $2, other_details = $3, total_amount = $4, \
            remark = COALESCE($5, remark), updated_at = now() \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(rent_amount)
    .bind(Json(other_details))
    .bind(total_amount)
    .bind(remark)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

/// Conditional on Pending so a concurrent transition cannot double-fire.
/// Returns the updated bill, or None when the status guard missed.
pub async fn mark_paid(
    pool: &PgPool,
    id: i64,
    paid_amount: Decimal,
    payment_method: Option<&str>,
    paid_at: DateTime<Utc>,
) -> AppResult<Option<Bill>> {
    sqlx::query_as::<_, Bill>(&format!(
        "UPDATE bills SET status = 2, paid_amount = $2, payment_method = $3, \
            paid_at = $4, updated_at = now() \
         WHERE id = $1 AND status = 1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(paid_amount)
    .bind(payment_method)
    .bind(paid_at)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

pub async fn void(pool: &PgPool, id: i64) -> AppResult<Option<Bill>> {
    sqlx::query_as::<_, Bill>(&format!(
        "UPDATE bills SET status = 3, updated_at = now() \
         WHERE id = $1 AND status = 1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(map_db_error)
}

/// Deletes only while the bill is still Pending. Returns false when the
/// status guard missed, like the transition updates above.
pub async fn delete_pending(pool: &PgPool, id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM bills WHERE id = $1 AND status = 1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(map_db_error)?;
    Ok(result.rows_affected() > 0)
}

/// Removal for regeneration: Pending and Voided rows go, a Paid row is
/// settled money and stays no matter what the caller saw earlier.
pub async fn delete_unless_paid(executor: impl PgExecutor<'_>, id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM bills WHERE id = $1 AND status <> 2")
        .bind(id)
        .execute(executor)
        .await
        .map_err(map_db_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_for_reading(pool: &PgPool, meter_reading_id: i64) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM bills WHERE meter_reading_id = $1")
        .bind(meter_reading_id)
        .fetch_one(pool)
        .await
        .map_err(map_db_error)
}

pub async fn statistics(
    pool: &PgPool,
    landlord_id: i64,
    month: Option<&str>,
) -> AppResult<BillStatistics> {
    sqlx::query_as::<_, BillStatistics>(
        "SELECT count(*) AS total_count, \
            count(*) FILTER (WHERE b.status = 1) AS pending_count, \
            count(*) FILTER (WHERE b.status = 2) AS paid_count, \
            COALESCE(sum(b.total_amount) FILTER (WHERE b.status <> 3), 0) AS total_amount, \
            COALESCE(sum(b.paid_amount) FILTER (WHERE b.status = 2), 0) AS paid_amount \
         FROM bills b \
         JOIN rooms r ON r.id = b.room_id \
         JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = $1 AND ($2::text IS NULL OR b.bill_month = $2)",
    )
    .bind(landlord_id)
    .bind(month)
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

pub async fn list_by_month(
    pool: &PgPool,
    landlord_id: i64,
    month: &str,
) -> AppResult<Vec<BillRow>> {
    sqlx::query_as::<_, BillRow>(
        "SELECT b.*, r.room_name, p.name AS property_name \
         FROM bills b \
         JOIN rooms r ON r.id = b.room_id \
         JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = $1 AND b.bill_month = $2 \
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
    status: Option<i16>,
    keyword: Option<&str>,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<BillRow>, i64)> {
    let mut count_qb = QueryBuilder::<Postgres>::new(
        "SELECT count(*) FROM bills b \
         JOIN rooms r ON r.id = b.room_id \
         JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = ",
    );
    push_bill_filters(&mut count_qb, landlord_id, room_id, month, status, keyword);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(map_db_error)?;

    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT b.*, r.room_name, p.name AS property_name \
         FROM bills b \
         JOIN rooms r ON r.id = b.room_id \
         JOIN properties p ON p.id = r.property_id \
         WHERE p.landlord_id = ",
    );
    push_bill_filters(&mut qb, landlord_id, room_id, month, status, keyword);
    qb.push(" ORDER BY b.bill_month DESC, b.id DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);

    let records = qb
        .build_query_as::<BillRow>()
        .fetch_all(pool)
        .await
        .map_err(map_db_error)?;
    Ok((records, total))
}

fn push_bill_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    landlord_id: i64,
    room_id: Option<i64>,
    month: Option<&str>,
    status: Option<i16>,
    keyword: Option<&str>,
) {
    qb.push_bind(landlord_id);
    if let Some(room_id) = room_id {
        qb.push(" AND b.room_id = ");
        qb.push_bind(room_id);
    }
    if let Some(month) = month.filter(|value| !value.trim().is_empty()) {
        qb.push(" AND b.bill_month = ");
        qb.push_bind(month.trim().to_string());
    }
    if let Some(status) = status {
        qb.push(" AND b.status = ");
        qb.push_bind(status);
    }
    if let Some(keyword) = keyword.filter(|value| !value.trim().is_empty()) {
        qb.push(" AND (b.bill_no ILIKE ");
        qb.push_bind(format!("%{}%", keyword.trim()));
        qb.push(" OR r.room_name ILIKE ");
        qb.push_bind(format!("%{}%", keyword.trim()));
        qb.push(")");
    }
}
