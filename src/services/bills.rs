use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::domain::{validate_month, Bill, BillStatus, FeeLine, MeterReading, Room};
use crate::error::{AppError, AppResult};
use crate::ownership;
use crate::repository::bills as repo;
use crate::repository::bills::{BillRow, BillStatistics, NewBill};
use crate::repository::map_db_error;
use crate::repository::meter_readings;
use crate::schemas::{BatchGenerateInput, CreateBillInput, PayBillInput, UpdateBillInput};
use crate::services::billing::{self, FeeSchedule, Usage};

/// Bill detail shape with the joined names and a readable status.
#[derive(Debug, Serialize)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub room_name: String,
    pub property_name: String,
    pub status_label: &'static str,
}

/// `B` + date + a millisecond tail + a random salt. Unique enough that
/// two bills generated in the same millisecond still differ; the unique
/// index backstops the rest.
pub fn generate_bill_no(now: DateTime<Utc>) -> String {
    let millis_tail = now.timestamp_millis().rem_euclid(100_000_000);
    let salt: u16 = rand::thread_rng().gen_range(0..1000);
    format!("B{}{:08}{:03}", now.format("%Y%m%d"), millis_tail, salt)
}

fn usage_of(reading: &MeterReading) -> Usage {
    Usage {
        water: reading.water_usage,
        electricity: reading.electricity_usage,
    }
}

/// Overwriting may replace a Pending or Voided bill; a Paid bill is
/// money already collected and never regenerated. The in-core check is
/// a fast path, the conditional delete at the persistence edge decides.
fn replaceable_on_overwrite(status: Option<BillStatus>) -> bool {
    status != Some(BillStatus::Paid)
}

/// Shared generation path for single, manual and batch creation. The
/// caller has already authorized the room and resolved the reading, and
/// runs this inside a transaction so the duplicate check and the insert
/// land together.
#[allow(clippy::too_many_arguments)]
async fn generate_for_room(
    conn: &mut PgConnection,
    landlord_id: i64,
    room: &Room,
    reading: Option<&MeterReading>,
    month: &str,
    rent_override: Option<Decimal>,
    other_override: Option<&[FeeLine]>,
    remark: Option<&str>,
) -> AppResult<Bill> {
    let tenant_id = room.tenant_id.ok_or_else(|| {
        AppError::InvalidInput(format!("room {} has no bound tenant", room.id))
    })?;

    if repo::find_by_room_month(&mut *conn, room.id, month)
        .await?
        .is_some()
    {
        return Err(AppError::Duplicate(format!(
            "room {} already has a bill for {month}",
            room.id
        )));
    }

    let schedule = FeeSchedule::from(room);
    let usage = reading.map(usage_of);
    let breakdown = billing::compute(&schedule, usage.as_ref(), rent_override, other_override);

    let bill_no = generate_bill_no(Utc::now());
    let bill = repo::insert(
        &mut *conn,
        NewBill {
            bill_no: &bill_no,
            room_id: room.id,
            tenant_id,
            bill_month: month,
            meter_reading_id: reading.map(|r| r.id),
            rent_amount: breakdown.rent_amount,
            water_amount: breakdown.water_amount,
            electricity_amount: breakdown.electricity_amount,
            cleaning_amount: breakdown.cleaning_amount,
            other_details: &breakdown.other_details,
            total_amount: breakdown.total_amount,
            remark,
        },
    )
    .await?;

    tracing::info!(
        landlord_id,
        room_id = room.id,
        bill_id = bill.id,
        bill_no = %bill.bill_no,
        month,
        total = %bill.total_amount,
        "bill generated"
    );
    Ok(bill)
}

pub async fn generate_from_reading(
    pool: &PgPool,
    landlord_id: i64,
    reading_id: i64,
) -> AppResult<Bill> {
    let (reading, room) = ownership::authorize_reading(pool, reading_id, landlord_id).await?;
    let month = reading.reading_month.clone();
    let mut tx = pool.begin().await.map_err(map_db_error)?;
    let bill = generate_for_room(
        &mut tx,
        landlord_id,
        &room,
        Some(&reading),
        &month,
        None,
        None,
        None,
    )
    .await?;
    tx.commit().await.map_err(map_db_error)?;
    Ok(bill)
}

pub async fn create_manual(
    pool: &PgPool,
    landlord_id: i64,
    input: &CreateBillInput,
) -> AppResult<Bill> {
    validate_month(&input.bill_month)?;
    let room = ownership::authorize_room(pool, input.room_id, landlord_id).await?;

    let reading = match input.meter_reading_id {
        Some(reading_id) => {
            let (reading, _room) =
                ownership::authorize_reading(pool, reading_id, landlord_id).await?;
            if reading.room_id != room.id {
                return Err(AppError::InvalidInput(
                    "the reading belongs to a different room".to_string(),
                ));
            }
            Some(reading)
        }
        None => None,
    };

    let mut tx = pool.begin().await.map_err(map_db_error)?;
    let bill = generate_for_room(
        &mut tx,
        landlord_id,
        &room,
        reading.as_ref(),
        &input.bill_month,
        input.rent_amount,
        input.other_details.as_deref(),
        input.remark.as_deref(),
    )
    .await?;
    tx.commit().await.map_err(map_db_error)?;
    Ok(bill)
}

/// Only rent and the other-fee lines are editable, and only while the
/// bill is still Pending. The total is recomputed against the stored
/// metered amounts.
pub async fn update(pool: &PgPool, landlord_id: i64, input: &UpdateBillInput) -> AppResult<Bill> {
    let (bill, _room) = ownership::authorize_bill(pool, input.id, landlord_id).await?;
    if !bill.bill_status().is_some_and(BillStatus::is_open) {
        return Err(AppError::InvalidState(
            "only a pending bill can be edited".to_string(),
        ));
    }

    let rent_amount = billing::round_money(input.rent_amount.unwrap_or(bill.rent_amount));
    let other_details: Vec<FeeLine> = input
        .other_details
        .clone()
        .unwrap_or_else(|| bill.other_details.0.clone())
        .into_iter()
        .map(|line| FeeLine {
            name: line.name,
            amount: billing::round_money(line.amount),
        })
        .collect();
    let other_total: Decimal = other_details.iter().map(|line| line.amount).sum();
    let total_amount = billing::round_money(
        rent_amount
            + bill.water_amount
            + bill.electricity_amount
            + bill.cleaning_amount
            + other_total,
    );

    let updated = repo::update_amounts(
        pool,
        bill.id,
        rent_amount,
        &other_details,
        total_amount,
        input.remark.as_deref(),
    )
    .await?;
    tracing::info!(
        landlord_id,
        bill_id = updated.id,
        total = %updated.total_amount,
        "bill amounts updated"
    );
    Ok(updated)
}

pub async fn delete(pool: &PgPool, landlord_id: i64, bill_id: i64) -> AppResult<()> {
    let (bill, _room) = ownership::authorize_bill(pool, bill_id, landlord_id).await?;
    if !bill.bill_status().is_some_and(BillStatus::is_open)
        || !repo::delete_pending(pool, bill.id).await?
    {
        return Err(AppError::InvalidState(
            "only a pending bill can be deleted".to_string(),
        ));
    }
    tracing::info!(landlord_id, bill_id, "bill deleted");
    Ok(())
}

pub async fn mark_paid(
    pool: &PgPool,
    landlord_id: i64,
    bill_id: i64,
    input: &PayBillInput,
) -> AppResult<Bill> {
    if input.paid_amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput(
            "paid amount must be positive".to_string(),
        ));
    }
    let (bill, _room) = ownership::authorize_bill(pool, bill_id, landlord_id).await?;

    let paid = repo::mark_paid(
        pool,
        bill.id,
        billing::round_money(input.paid_amount),
        input.payment_method.as_deref(),
        Utc::now(),
    )
    .await?
    .ok_or_else(|| {
        AppError::InvalidState(format!(
            "bill {} is not pending and cannot be paid",
            bill.bill_no
        ))
    })?;

    tracing::info!(
        landlord_id,
        bill_id = paid.id,
        bill_no = %paid.bill_no,
        paid_amount = %paid.paid_amount,
        "bill paid"
    );
    Ok(paid)
}

pub async fn void(pool: &PgPool, landlord_id: i64, bill_id: i64) -> AppResult<Bill> {
    let (bill, _room) = ownership::authorize_bill(pool, bill_id, landlord_id).await?;

    let voided = repo::void(pool, bill.id).await?.ok_or_else(|| {
        AppError::InvalidState(format!(
            "bill {} is already {} and cannot be voided",
            bill.bill_no,
            bill.bill_status().map(|s| s.label()).unwrap_or("settled")
        ))
    })?;

    tracing::info!(landlord_id, bill_id = voided.id, bill_no = %voided.bill_no, "bill voided");
    Ok(voided)
}

/// Generates one month of bills for many rooms. Per-room failures are
/// logged and skipped, the count of generated bills comes back.
pub async fn batch_generate(
    pool: &PgPool,
    landlord_id: i64,
    input: &BatchGenerateInput,
) -> AppResult<u64> {
    validate_month(&input.bill_month)?;
    let month = input.bill_month.as_str();

    // Candidate rooms come from the request, or from every reading the
    // landlord recorded for the month.
    let room_ids: Vec<i64> = match &input.room_ids {
        Some(ids) => ids.clone(),
        None => meter_readings::list_by_month(pool, landlord_id, month)
            .await?
            .into_iter()
            .map(|row| row.reading.room_id)
            .collect(),
    };

    let mut generated = 0u64;
    for room_id in room_ids {
        match generate_one_of_batch(pool, landlord_id, room_id, month, input.overwrite).await {
            Ok(true) => generated += 1,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(
                    landlord_id,
                    room_id,
                    month,
                    error = %err,
                    "skipping room in batch generation"
                );
            }
        }
    }
    tracing::info!(landlord_id, month, generated, "batch bill generation done");
    Ok(generated)
}

async fn generate_one_of_batch(
    pool: &PgPool,
    landlord_id: i64,
    room_id: i64,
    month: &str,
    overwrite: bool,
) -> AppResult<bool> {
    let room = ownership::authorize_room(pool, room_id, landlord_id).await?;

    let existing = repo::find_by_room_month(pool, room.id, month).await?;
    if let Some(existing) = &existing {
        if !overwrite {
            tracing::warn!(landlord_id, room_id, month, "bill exists, not overwriting");
            return Ok(false);
        }
        if !replaceable_on_overwrite(existing.bill_status()) {
            tracing::warn!(
                landlord_id,
                room_id,
                month,
                bill_no = %existing.bill_no,
                "bill is paid, refusing to overwrite"
            );
            return Ok(false);
        }
    }

    let reading = meter_readings::find_for_month(pool, room.id, month).await?;
    let Some(reading) = reading else {
        tracing::warn!(landlord_id, room_id, month, "no reading for month, skipping");
        return Ok(false);
    };

    // Removal of the stale bill and the regeneration land atomically.
    // The delete re-checks the status, so a bill paid after the read
    // above stays put and the room is skipped.
    let mut tx = pool.begin().await.map_err(map_db_error)?;
    if let Some(existing) = &existing {
        if !repo::delete_unless_paid(&mut *tx, existing.id).await? {
            tracing::warn!(
                landlord_id,
                room_id,
                month,
                bill_no = %existing.bill_no,
                "bill was settled concurrently, refusing to overwrite"
            );
            return Ok(false);
        }
        tracing::info!(
            landlord_id,
            room_id,
            month,
            bill_no = %existing.bill_no,
            "existing bill removed for regeneration"
        );
    }
    generate_for_room(
        &mut tx,
        landlord_id,
        &room,
        Some(&reading),
        month,
        None,
        None,
        None,
    )
    .await?;
    tx.commit().await.map_err(map_db_error)?;
    Ok(true)
}

pub async fn get_detail(pool: &PgPool, landlord_id: i64, bill_id: i64) -> AppResult<BillDetail> {
    let (bill, _room) = ownership::authorize_bill(pool, bill_id, landlord_id).await?;
    let row = repo::find_row_by_id(pool, bill.id).await?.ok_or_else(|| {
        AppError::NotFound(format!("bill {bill_id} does not exist"))
    })?;
    let status_label = row
        .bill
        .bill_status()
        .map(|status| status.label())
        .unwrap_or("unknown");
    Ok(BillDetail {
        bill: row.bill,
        room_name: row.room_name,
        property_name: row.property_name,
        status_label,
    })
}

pub async fn statistics(
    pool: &PgPool,
    landlord_id: i64,
    month: Option<&str>,
) -> AppResult<BillStatistics> {
    if let Some(month) = month {
        validate_month(month)?;
    }
    repo::statistics(pool, landlord_id, month).await
}

pub async fn list_by_month(
    pool: &PgPool,
    landlord_id: i64,
    month: &str,
) -> AppResult<Vec<BillRow>> {
    validate_month(month)?;
    repo::list_by_month(pool, landlord_id, month).await
}

pub async fn exists(pool: &PgPool, landlord_id: i64, room_id: i64, month: &str) -> AppResult<bool> {
    validate_month(month)?;
    ownership::authorize_room(pool, room_id, landlord_id).await?;
    Ok(repo::find_by_room_month(pool, room_id, month).await?.is_some())
}

#[allow(clippy::too_many_arguments)]
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
    repo::page(pool, landlord_id, room_id, month, status, keyword, limit, offset).await
}

#[cfg(test)]
mod tests {
    use super::{generate_bill_no, replaceable_on_overwrite};
    use crate::domain::BillStatus;
    use chrono::{TimeZone, Utc};

    #[test]
    fn bill_no_shape() {
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 10, 30, 0).unwrap();
        let bill_no = generate_bill_no(now);
        assert!(bill_no.starts_with("B20240715"));
        assert_eq!(bill_no.len(), 20);
        assert!(bill_no[1..].bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn bill_no_varies_within_a_millisecond() {
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 10, 30, 0).unwrap();
        let numbers: std::collections::HashSet<String> =
            (0..50).map(|_| generate_bill_no(now)).collect();
        // The random salt makes same-instant collisions unlikely.
        assert!(numbers.len() > 1);
    }

    #[test]
    fn overwrite_never_replaces_a_paid_bill() {
        assert!(replaceable_on_overwrite(Some(BillStatus::Pending)));
        assert!(replaceable_on_overwrite(Some(BillStatus::Voided)));
        assert!(!replaceable_on_overwrite(Some(BillStatus::Paid)));
    }
}
