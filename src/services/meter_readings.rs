use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::{validate_month, MeterReading, Room};
use crate::error::{AppError, AppResult};
use crate::ownership;
use crate::repository::meter_readings as repo;
use crate::repository::meter_readings::{NewReading, ReadingRow};
use crate::repository::{bills, map_db_error, rooms};
use crate::schemas::{BatchReadingsInput, CreateReadingInput, UpdateReadingInput};

/// Usage is the delta between the current and previous reading. A meter
/// can only move forward; a negative delta means a typo or a swapped
/// meter and is rejected before anything is written.
pub fn usage_delta(meter: &str, current: Decimal, previous: Decimal) -> AppResult<Decimal> {
    let delta = current - previous;
    if delta < Decimal::ZERO {
        return Err(AppError::InvalidInput(format!(
            "{meter} reading {current} is below the previous reading {previous}"
        )));
    }
    Ok(delta)
}

/// The room snapshot only ever rolls forward: a back-filled or corrected
/// older month must not drag `last_*_reading` below the newest entry.
fn snapshot_should_advance(written_month: &str, latest_month: Option<&str>) -> bool {
    latest_month.is_none_or(|latest| written_month >= latest)
}

/// Previous readings resolve from the latest prior ledger entry, falling
/// back to the room's stored last-known snapshot, then zero.
async fn resolve_previous(pool: &PgPool, room: &Room, month: &str) -> AppResult<(Decimal, Decimal)> {
    if let Some(prior) = repo::latest_before(pool, room.id, month).await? {
        return Ok((prior.water_reading, prior.electricity_reading));
    }
    Ok((
        room.last_water_reading.unwrap_or(Decimal::ZERO),
        room.last_electricity_reading.unwrap_or(Decimal::ZERO),
    ))
}

pub async fn add_reading(
    pool: &PgPool,
    landlord_id: i64,
    input: &CreateReadingInput,
) -> AppResult<MeterReading> {
    validate_month(&input.reading_month)?;
    let room = ownership::authorize_room(pool, input.room_id, landlord_id).await?;

    if repo::exists_for_month(pool, room.id, &input.reading_month, None).await? {
        return Err(AppError::Duplicate(format!(
            "room {} already has a reading for {}",
            room.id, input.reading_month
        )));
    }

    let (prev_water, prev_electricity) = resolve_previous(pool, &room, &input.reading_month).await?;
    let water_usage = usage_delta("water", input.water_reading, prev_water)?;
    let electricity_usage =
        usage_delta("electricity", input.electricity_reading, prev_electricity)?;

    // Ledger insert and the room snapshot move together.
    let mut tx = pool.begin().await.map_err(map_db_error)?;
    let latest = repo::latest_month(&mut *tx, room.id).await?;
    let reading = repo::insert(
        &mut *tx,
        NewReading {
            room_id: room.id,
            reading_month: &input.reading_month,
            water_reading: input.water_reading,
            electricity_reading: input.electricity_reading,
            prev_water_reading: prev_water,
            prev_electricity_reading: prev_electricity,
            water_usage,
            electricity_usage,
            reading_date: input
                .reading_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            images: &input.images,
        },
    )
    .await?;
    if snapshot_should_advance(&input.reading_month, latest.as_deref()) {
        rooms::update_last_readings(
            &mut *tx,
            room.id,
            input.water_reading,
            input.electricity_reading,
        )
        .await?;
    }
    tx.commit().await.map_err(map_db_error)?;

    tracing::info!(
        landlord_id,
        room_id = room.id,
        reading_id = reading.id,
        month = %reading.reading_month,
        %water_usage,
        %electricity_usage,
        "meter reading recorded"
    );
    Ok(reading)
}

/// The month and the previous-reading snapshot are immutable; usage is
/// recomputed against the stored snapshot.
pub async fn update_reading(
    pool: &PgPool,
    landlord_id: i64,
    input: &UpdateReadingInput,
) -> AppResult<MeterReading> {
    let (stored, _room) = ownership::authorize_reading(pool, input.id, landlord_id).await?;

    let water_usage = usage_delta("water", input.water_reading, stored.prev_water_reading)?;
    let electricity_usage = usage_delta(
        "electricity",
        input.electricity_reading,
        stored.prev_electricity_reading,
    )?;

    let mut tx = pool.begin().await.map_err(map_db_error)?;
    let latest = repo::latest_month(&mut *tx, stored.room_id).await?;
    let reading = repo::update(
        &mut *tx,
        stored.id,
        input.water_reading,
        input.electricity_reading,
        water_usage,
        electricity_usage,
        input.reading_date,
        input.images.as_deref(),
    )
    .await?;
    // Correcting an older month leaves the snapshot alone; only the
    // room's newest entry carries it.
    if snapshot_should_advance(&stored.reading_month, latest.as_deref()) {
        rooms::update_last_readings(
            &mut *tx,
            reading.room_id,
            input.water_reading,
            input.electricity_reading,
        )
        .await?;
    }
    tx.commit().await.map_err(map_db_error)?;

    tracing::info!(
        landlord_id,
        reading_id = reading.id,
        %water_usage,
        %electricity_usage,
        "meter reading corrected"
    );
    Ok(reading)
}

pub async fn delete_reading(pool: &PgPool, landlord_id: i64, reading_id: i64) -> AppResult<()> {
    let (reading, _room) = ownership::authorize_reading(pool, reading_id, landlord_id).await?;

    let referencing = bills::count_for_reading(pool, reading.id).await?;
    if referencing > 0 {
        return Err(AppError::InvalidState(
            "a bill references this reading, void or delete the bill first".to_string(),
        ));
    }

    repo::delete(pool, reading.id).await?;
    tracing::info!(landlord_id, reading_id, "meter reading deleted");
    Ok(())
}

/// Records one month of readings for many rooms. Each item stands alone:
/// a failed item is logged and skipped, the rest still land.
pub async fn batch_add_readings(
    pool: &PgPool,
    landlord_id: i64,
    input: &BatchReadingsInput,
) -> AppResult<u64> {
    validate_month(&input.reading_month)?;
    let mut recorded = 0u64;
    for item in &input.items {
        let single = CreateReadingInput {
            room_id: item.room_id,
            reading_month: input.reading_month.clone(),
            water_reading: item.water_reading,
            electricity_reading: item.electricity_reading,
            reading_date: input.reading_date,
            images: Vec::new(),
        };
        match add_reading(pool, landlord_id, &single).await {
            Ok(_) => recorded += 1,
            Err(err) => {
                tracing::warn!(
                    landlord_id,
                    room_id = item.room_id,
                    month = %input.reading_month,
                    error = %err,
                    "skipping reading in batch"
                );
            }
        }
    }
    tracing::info!(
        landlord_id,
        month = %input.reading_month,
        recorded,
        submitted = input.items.len(),
        "batch readings done"
    );
    Ok(recorded)
}

pub async fn get_reading(
    pool: &PgPool,
    landlord_id: i64,
    reading_id: i64,
) -> AppResult<MeterReading> {
    let (reading, _room) = ownership::authorize_reading(pool, reading_id, landlord_id).await?;
    Ok(reading)
}

pub async fn latest_for_room(
    pool: &PgPool,
    landlord_id: i64,
    room_id: i64,
) -> AppResult<Option<MeterReading>> {
    ownership::authorize_room(pool, room_id, landlord_id).await?;
    repo::latest_for_room(pool, room_id).await
}

pub async fn exists(
    pool: &PgPool,
    landlord_id: i64,
    room_id: i64,
    month: &str,
) -> AppResult<bool> {
    validate_month(month)?;
    ownership::authorize_room(pool, room_id, landlord_id).await?;
    repo::exists_for_month(pool, room_id, month, None).await
}

pub async fn list_by_month(
    pool: &PgPool,
    landlord_id: i64,
    month: &str,
) -> AppResult<Vec<ReadingRow>> {
    validate_month(month)?;
    repo::list_by_month(pool, landlord_id, month).await
}

pub async fn page(
    pool: &PgPool,
    landlord_id: i64,
    room_id: Option<i64>,
    month: Option<&str>,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<ReadingRow>, i64)> {
    repo::page(pool, landlord_id, room_id, month, limit, offset).await
}

#[cfg(test)]
mod tests {
    use super::{snapshot_should_advance, usage_delta};
    use crate::error::AppError;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn usage_is_current_minus_previous() {
        assert_eq!(usage_delta("water", dec("130.5"), dec("120")).unwrap(), dec("10.5"));
        assert_eq!(usage_delta("water", dec("120"), dec("120")).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn negative_usage_is_rejected() {
        let err = usage_delta("electricity", dec("99"), dec("100")).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        let AppError::InvalidInput(message) = err else {
            unreachable!()
        };
        assert!(message.contains("electricity"));
        assert!(message.contains("99"));
    }

    #[test]
    fn snapshot_advances_for_the_newest_month() {
        assert!(snapshot_should_advance("2024-08", Some("2024-07")));
        assert!(snapshot_should_advance("2025-01", Some("2024-12")));
        // First entry ever for the room.
        assert!(snapshot_should_advance("2024-07", None));
        // Correcting the current newest month re-applies its values.
        assert!(snapshot_should_advance("2024-08", Some("2024-08")));
    }

    #[test]
    fn back_filled_months_leave_the_snapshot_alone() {
        assert!(!snapshot_should_advance("2024-06", Some("2024-08")));
        assert!(!snapshot_should_advance("2023-12", Some("2024-01")));
    }
}
