use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use crate::auth::require_landlord;
use crate::error::AppResult;
use crate::response;
use crate::schemas::{validate_input, CreatePropertyInput, UpdatePropertyInput};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/properties", get(list).post(create).put(update))
        .route("/properties/{id}", get(get_one).delete(delete_one))
}

async fn list(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let properties = services::properties::list(pool, landlord_id).await?;
    Ok(response::ok(properties))
}

async fn get_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let property = services::properties::get(pool, landlord_id, id).await?;
    Ok(response::ok(property))
}

async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreatePropertyInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let property = services::properties::create(pool, landlord_id, &input).await?;
    Ok(response::ok(property))
}

async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UpdatePropertyInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let property = services::properties::update(pool, landlord_id, &input).await?;
    Ok(response::ok(property))
}

async fn delete_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    services::properties::delete(pool, landlord_id, id).await?;
    Ok(response::ok(serde_json::json!({ "deleted": true })))
}
