//! Ownership checks for the landlord resource graph. Every guard re-derives
//! ownership from the database on each call; nothing here is cached, so a
//! transfer or deletion takes effect on the next request.

use sqlx::PgPool;

use crate::domain::{Bill, MeterReading, Property, Room};
use crate::error::{AppError, AppResult};
use crate::repository::{bills, meter_readings, properties, rooms};

pub async fn authorize_property(
    pool: &PgPool,
    property_id: i64,
    landlord_id: i64,
) -> AppResult<Property> {
    let property = properties::find_by_id(pool, property_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("property {property_id} does not exist")))?;
    if property.landlord_id != landlord_id {
        return Err(AppError::Forbidden(
            "property belongs to another landlord".to_string(),
        ));
    }
    Ok(property)
}

pub async fn authorize_room(pool: &PgPool, room_id: i64, landlord_id: i64) -> AppResult<Room> {
    let owned = rooms::find_with_landlord(pool, room_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("room {room_id} does not exist")))?;
    if owned.landlord_id != landlord_id {
        return Err(AppError::Forbidden(
            "room belongs to another landlord".to_string(),
        ));
    }
    Ok(owned.room)
}

/// Resolves the reading and authorizes it through its room.
pub async fn authorize_reading(
    pool: &PgPool,
    reading_id: i64,
    landlord_id: i64,
) -> AppResult<(MeterReading, Room)> {
    let reading = meter_readings::find_by_id(pool, reading_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("meter reading {reading_id} does not exist")))?;
    let room = authorize_room(pool, reading.room_id, landlord_id).await?;
    Ok((reading, room))
}

pub async fn authorize_bill(
    pool: &PgPool,
    bill_id: i64,
    landlord_id: i64,
) -> AppResult<(Bill, Room)> {
    let bill = bills::find_by_id(pool, bill_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("bill {bill_id} does not exist")))?;
    let room = authorize_room(pool, bill.room_id, landlord_id).await?;
    Ok((bill, room))
}
