use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::Value;

use crate::auth::require_landlord;
use crate::error::AppResult;
use crate::response::{self, Page};
use crate::schemas::{
    page_bounds, validate_input, BatchRoomStatusInput, BindTenantInput, CreateRoomInput,
    RoomPageQuery, UpdateFeesInput, UpdateRoomInput,
};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create).put(update))
        .route("/rooms/page", get(page))
        .route("/rooms/options", get(options))
        .route("/rooms/fees", put(update_fees))
        .route("/rooms/batch-status", put(batch_status))
        .route("/rooms/{id}", get(get_one).delete(delete_one))
        .route("/rooms/{id}/bind-tenant", post(bind_tenant))
        .route("/rooms/{id}/unbind-tenant", post(unbind_tenant))
}

async fn page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RoomPageQuery>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let (current, size, offset) = page_bounds(query.current, query.size);
    let (records, total) = services::rooms::page(
        pool,
        landlord_id,
        query.property_id,
        query.status,
        query.keyword.as_deref(),
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

async fn options(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let options = services::rooms::options(pool, landlord_id).await?;
    Ok(response::ok(options))
}

async fn get_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let room = services::rooms::get_room(pool, landlord_id, id).await?;
    Ok(response::ok(room))
}

async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateRoomInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let room = services::rooms::add_room(pool, landlord_id, &input).await?;
    Ok(response::ok(room))
}

async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UpdateRoomInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let room = services::rooms::update_room(pool, landlord_id, &input).await?;
    Ok(response::ok(room))
}

async fn delete_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    services::rooms::delete_room(pool, landlord_id, id).await?;
    Ok(response::ok(serde_json::json!({ "deleted": true })))
}

async fn bind_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<BindTenantInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let room = services::rooms::bind_tenant(pool, landlord_id, id, &input).await?;
    Ok(response::ok(room))
}

async fn unbind_tenant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let room = services::rooms::unbind_tenant(pool, landlord_id, id).await?;
    Ok(response::ok(room))
}

async fn update_fees(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UpdateFeesInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let room = services::rooms::update_fees(pool, landlord_id, &input).await?;
    Ok(response::ok(room))
}

async fn batch_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<BatchRoomStatusInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let updated = services::rooms::batch_update_status(pool, landlord_id, &input).await?;
    Ok(response::ok(serde_json::json!({ "updated": updated })))
}
