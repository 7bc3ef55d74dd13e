use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::auth::require_landlord;
use crate::error::AppResult;
use crate::response::{self, Page};
use crate::schemas::{
    page_bounds, validate_input, BatchReadingsInput, CreateReadingInput, ReadingExistsQuery,
    ReadingPageQuery, UpdateReadingInput,
};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/meter-readings", post(create).put(update))
        .route("/meter-readings/page", get(page))
        .route("/meter-readings/batch", post(batch_create))
        .route("/meter-readings/exists", get(exists))
        .route("/meter-readings/latest/{room_id}", get(latest))
        .route("/meter-readings/monthly/{month}", get(monthly))
        .route("/meter-readings/{id}", get(get_one).delete(delete_one))
        .route("/meter-readings/{id}/generate-bill", post(generate_bill))
}

async fn page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReadingPageQuery>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let (current, size, offset) = page_bounds(query.current, query.size);
    let (records, total) = services::meter_readings::page(
        pool,
        landlord_id,
        query.room_id,
        query.month.as_deref(),
        size,
        offset,
    )
    .await?;
    Ok(response::ok(Page {
        records,
        total,
        current,
        size,
    }))
}

async fn get_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let reading = services::meter_readings::get_reading(pool, landlord_id, id).await?;
    Ok(response::ok(reading))
}

async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateReadingInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let reading = services::meter_readings::add_reading(pool, landlord_id, &input).await?;
    Ok(response::ok(reading))
}

async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UpdateReadingInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let reading = services::meter_readings::update_reading(pool, landlord_id, &input).await?;
    Ok(response::ok(reading))
}

async fn delete_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    services::meter_readings::delete_reading(pool, landlord_id, id).await?;
    Ok(response::ok(serde_json::json!({ "deleted": true })))
}

async fn batch_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<BatchReadingsInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let recorded = services::meter_readings::batch_add_readings(pool, landlord_id, &input).await?;
    Ok(response::ok(serde_json::json!({ "recorded": recorded })))
}

async fn latest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let reading = services::meter_readings::latest_for_room(pool, landlord_id, room_id).await?;
    Ok(response::ok(reading))
}

async fn monthly(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(month): Path<String>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let readings = services::meter_readings::list_by_month(pool, landlord_id, &month).await?;
    Ok(response::ok(readings))
}

async fn exists(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReadingExistsQuery>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let exists =
        services::meter_readings::exists(pool, landlord_id, query.room_id, &query.month).await?;
    Ok(response::ok(serde_json::json!({ "exists": exists })))
}

async fn generate_bill(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let bill = services::bills::generate_from_reading(pool, landlord_id, id).await?;
    Ok(response::ok(bill))
}
