use sqlx::PgPool;

use crate::domain::{Room, RoomStatus};
use crate::error::{AppError, AppResult};
use crate::ownership;
use crate::repository::properties;
use crate::repository::rooms as repo;
use crate::repository::rooms::{NewRoom, RoomOption, RoomRow};
use crate::schemas::{
    BatchRoomStatusInput, BindTenantInput, CreateRoomInput, UpdateFeesInput, UpdateRoomInput,
};
use crate::services::auth;

/// Occupied and a bound tenant move together: `bind_tenant` is the only
/// way into Occupied and `unbind_tenant` the only way out, so a plain
/// status edit may not cross that line in either direction.
fn check_status_change(has_tenant: bool, status: i16) -> AppResult<RoomStatus> {
    let next = RoomStatus::from_code(status).ok_or_else(|| {
        AppError::InvalidInput(format!("{status} is not a valid room status"))
    })?;
    if next == RoomStatus::Occupied && !has_tenant {
        return Err(AppError::InvalidState(
            "bind a tenant to mark the room occupied".to_string(),
        ));
    }
    if next != RoomStatus::Occupied && has_tenant {
        return Err(AppError::InvalidState(
            "unbind the tenant before changing the room status".to_string(),
        ));
    }
    Ok(next)
}

pub async fn add_room(pool: &PgPool, landlord_id: i64, input: &CreateRoomInput) -> AppResult<Room> {
    ownership::authorize_property(pool, input.property_id, landlord_id).await?;

    if repo::name_exists(pool, input.property_id, &input.room_name, None).await? {
        return Err(AppError::Duplicate(format!(
            "room '{}' already exists in this property",
            input.room_name
        )));
    }

    let room = repo::insert(
        pool,
        NewRoom {
            property_id: input.property_id,
            room_name: &input.room_name,
            monthly_rent: input.monthly_rent,
            cleaning_fee: input.cleaning_fee,
            water_price: input.water_price,
            electricity_price: input.electricity_price,
            other_fees: &input.other_fees,
            remark: input.remark.as_deref(),
        },
    )
    .await?;
    properties::sync_room_count(pool, input.property_id).await?;

    tracing::info!(
        landlord_id,
        property_id = input.property_id,
        room_id = room.id,
        room_name = %room.room_name,
        "room added"
    );
    Ok(room)
}

pub async fn update_room(
    pool: &PgPool,
    landlord_id: i64,
    input: &UpdateRoomInput,
) -> AppResult<Room> {
    let room = ownership::authorize_room(pool, input.id, landlord_id).await?;

    if let Some(name) = input.room_name.as_deref() {
        if repo::name_exists(pool, room.property_id, name, Some(room.id)).await? {
            return Err(AppError::Duplicate(format!(
                "room '{name}' already exists in this property"
            )));
        }
    }
    if let Some(status) = input.status {
        check_status_change(room.tenant_id.is_some(), status)?;
    }

    let updated = repo::update(
        pool,
        room.id,
        input.room_name.as_deref(),
        input.status,
        input.remark.as_deref(),
    )
    .await?;
    tracing::info!(landlord_id, room_id = updated.id, "room updated");
    Ok(updated)
}

pub async fn delete_room(pool: &PgPool, landlord_id: i64, room_id: i64) -> AppResult<()> {
    let room = ownership::authorize_room(pool, room_id, landlord_id).await?;
    if room.tenant_id.is_some() {
        return Err(AppError::InvalidState(
            "unbind the tenant before deleting the room".to_string(),
        ));
    }
    repo::delete(pool, room.id).await?;
    properties::sync_room_count(pool, room.property_id).await?;
    tracing::info!(landlord_id, room_id, "room deleted");
    Ok(())
}

pub async fn bind_tenant(
    pool: &PgPool,
    landlord_id: i64,
    room_id: i64,
    input: &BindTenantInput,
) -> AppResult<Room> {
    let room = ownership::authorize_room(pool, room_id, landlord_id).await?;
    if room.is_occupied() {
        return Err(AppError::InvalidState(
            "the room is already occupied".to_string(),
        ));
    }

    let tenant =
        auth::find_or_create_tenant(pool, &input.phone, input.tenant_name.as_deref()).await?;

    let updated = repo::bind_tenant(
        pool,
        room.id,
        tenant.id,
        &input.phone,
        input.rent_start_date,
    )
    .await?;
    tracing::info!(
        landlord_id,
        room_id = updated.id,
        tenant_id = tenant.id,
        "tenant bound to room"
    );
    Ok(updated)
}

pub async fn unbind_tenant(pool: &PgPool, landlord_id: i64, room_id: i64) -> AppResult<Room> {
    let room = ownership::authorize_room(pool, room_id, landlord_id).await?;
    if !room.is_occupied() {
        return Err(AppError::InvalidState(
            "the room has no bound tenant".to_string(),
        ));
    }
    let updated = repo::unbind_tenant(pool, room.id).await?;
    tracing::info!(landlord_id, room_id = updated.id, "tenant unbound from room");
    Ok(updated)
}

pub async fn update_fees(
    pool: &PgPool,
    landlord_id: i64,
    input: &UpdateFeesInput,
) -> AppResult<Room> {
    let room = ownership::authorize_room(pool, input.room_id, landlord_id).await?;
    let updated = repo::update_fees(
        pool,
        room.id,
        input.monthly_rent,
        input.cleaning_fee,
        input.water_price,
        input.electricity_price,
        input.other_fees.as_deref(),
    )
    .await?;
    tracing::info!(landlord_id, room_id = updated.id, "room fee schedule updated");
    Ok(updated)
}

/// Per-room authorization; a failed room is skipped, not fatal.
pub async fn batch_update_status(
    pool: &PgPool,
    landlord_id: i64,
    input: &BatchRoomStatusInput,
) -> AppResult<u64> {
    if RoomStatus::from_code(input.status).is_none() {
        return Err(AppError::InvalidInput(format!(
            "{} is not a valid room status",
            input.status
        )));
    }

    let mut updated = 0u64;
    for &room_id in &input.room_ids {
        let outcome = match ownership::authorize_room(pool, room_id, landlord_id).await {
            Ok(room) => check_status_change(room.tenant_id.is_some(), input.status),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(_) => {
                repo::update_status(pool, room_id, input.status).await?;
                updated += 1;
            }
            Err(err) => {
                tracing::warn!(landlord_id, room_id, error = %err, "skipping room in batch status update");
            }
        }
    }
    tracing::info!(landlord_id, updated, status = input.status, "batch room status done");
    Ok(updated)
}

pub async fn get_room(pool: &PgPool, landlord_id: i64, room_id: i64) -> AppResult<Room> {
    ownership::authorize_room(pool, room_id, landlord_id).await
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
    repo::page(pool, landlord_id, property_id, status, keyword, limit, offset).await
}

pub async fn options(pool: &PgPool, landlord_id: i64) -> AppResult<Vec<RoomOption>> {
    repo::options(pool, landlord_id).await
}

#[cfg(test)]
mod tests {
    use super::check_status_change;
    use crate::domain::RoomStatus;
    use crate::error::AppError;

    #[test]
    fn status_edits_stay_on_the_vacant_side() {
        assert_eq!(
            check_status_change(false, RoomStatus::Vacant.code()).unwrap(),
            RoomStatus::Vacant
        );
        assert_eq!(
            check_status_change(false, RoomStatus::UnderRepair.code()).unwrap(),
            RoomStatus::UnderRepair
        );
    }

    #[test]
    fn occupied_requires_a_bound_tenant() {
        let err = check_status_change(false, RoomStatus::Occupied.code()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn leaving_occupied_requires_unbinding_first() {
        for status in [RoomStatus::Vacant, RoomStatus::UnderRepair] {
            let err = check_status_change(true, status.code()).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)));
        }
        // Re-asserting Occupied with the tenant still bound is a no-op
        // and stays allowed.
        assert_eq!(
            check_status_change(true, RoomStatus::Occupied.code()).unwrap(),
            RoomStatus::Occupied
        );
    }

    #[test]
    fn unknown_status_codes_are_rejected() {
        let err = check_status_change(false, 9).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
