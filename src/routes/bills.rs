use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::auth::require_landlord;
use crate::error::AppResult;
use crate::response::{self, Page};
use crate::schemas::{
    page_bounds, validate_input, BatchGenerateInput, BillExistsQuery, BillPageQuery,
    CreateBillInput, PayBillInput, StatisticsQuery, UpdateBillInput,
};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bills", post(create).put(update))
        .route("/bills/page", get(page))
        .route("/bills/statistics", get(statistics))
        .route("/bills/exists", get(exists))
        .route("/bills/batch-generate", post(batch_generate))
        .route("/bills/generate/{reading_id}", post(generate))
        .route("/bills/monthly/{month}", get(monthly))
        .route("/bills/{id}", get(get_one).delete(delete_one))
        .route("/bills/{id}/pay", post(pay))
        .route("/bills/{id}/void", post(void))
}

async fn page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BillPageQuery>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let (current, size, offset) = page_bounds(query.current, query.size);
    let (records, total) = services::bills::page(
        pool,
        landlord_id,
        query.room_id,
        query.month.as_deref(),
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

async fn get_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let detail = services::bills::get_detail(pool, landlord_id, id).await?;
    Ok(response::ok(detail))
}

async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateBillInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let bill = services::bills::create_manual(pool, landlord_id, &input).await?;
    Ok(response::ok(bill))
}

async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<UpdateBillInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let bill = services::bills::update(pool, landlord_id, &input).await?;
    Ok(response::ok(bill))
}

async fn delete_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    services::bills::delete(pool, landlord_id, id).await?;
    Ok(response::ok(serde_json::json!({ "deleted": true })))
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(reading_id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let bill = services::bills::generate_from_reading(pool, landlord_id, reading_id).await?;
    Ok(response::ok(bill))
}

async fn batch_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<BatchGenerateInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let generated = services::bills::batch_generate(pool, landlord_id, &input).await?;
    Ok(response::ok(serde_json::json!({ "generated": generated })))
}

async fn pay(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<PayBillInput>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    validate_input(&input)?;
    let pool = state.pool()?;
    let bill = services::bills::mark_paid(pool, landlord_id, id, &input).await?;
    Ok(response::ok(bill))
}

async fn void(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let bill = services::bills::void(pool, landlord_id, id).await?;
    Ok(response::ok(bill))
}

async fn statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StatisticsQuery>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let stats = services::bills::statistics(pool, landlord_id, query.month.as_deref()).await?;
    Ok(response::ok(stats))
}

async fn monthly(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(month): Path<String>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let bills = services::bills::list_by_month(pool, landlord_id, &month).await?;
    Ok(response::ok(bills))
}

async fn exists(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BillExistsQuery>,
) -> AppResult<Json<Value>> {
    let landlord_id = require_landlord(&state, &headers)?;
    let pool = state.pool()?;
    let exists = services::bills::exists(pool, landlord_id, query.room_id, &query.month).await?;
    Ok(response::ok(serde_json::json!({ "exists": exists })))
}
