use sqlx::PgPool;

use crate::domain::Property;
use crate::error::{AppError, AppResult};
use crate::ownership;
use crate::repository::properties as repo;
use crate::schemas::{CreatePropertyInput, UpdatePropertyInput};

pub async fn list(pool: &PgPool, landlord_id: i64) -> AppResult<Vec<Property>> {
    repo::list_by_landlord(pool, landlord_id).await
}

pub async fn get(pool: &PgPool, landlord_id: i64, property_id: i64) -> AppResult<Property> {
    ownership::authorize_property(pool, property_id, landlord_id).await
}

pub async fn create(
    pool: &PgPool,
    landlord_id: i64,
    input: &CreatePropertyInput,
) -> AppResult<Property> {
    let property = repo::insert(pool, landlord_id, &input.name, input.address.as_deref()).await?;
    tracing::info!(landlord_id, property_id = property.id, name = %property.name, "property created");
    Ok(property)
}

pub async fn update(
    pool: &PgPool,
    landlord_id: i64,
    input: &UpdatePropertyInput,
) -> AppResult<Property> {
    ownership::authorize_property(pool, input.id, landlord_id).await?;
    let property = repo::update(pool, input.id, input.name.as_deref(), input.address.as_deref()).await?;
    tracing::info!(landlord_id, property_id = property.id, "property updated");
    Ok(property)
}

/// A property with rooms still under it cannot be removed.
pub async fn delete(pool: &PgPool, landlord_id: i64, property_id: i64) -> AppResult<()> {
    ownership::authorize_property(pool, property_id, landlord_id).await?;
    let rooms = repo::room_count(pool, property_id).await?;
    if rooms > 0 {
        return Err(AppError::InvalidState(format!(
            "the property still has {rooms} rooms, delete them first"
        )));
    }
    repo::delete(pool, property_id).await?;
    tracing::info!(landlord_id, property_id, "property deleted");
    Ok(())
}
