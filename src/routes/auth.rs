use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use crate::error::AppResult;
use crate::response;
use crate::schemas::{validate_input, LoginInput, RegisterInput, SendSmsInput, VerifySmsInput};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/sms/send", post(send_sms))
        .route("/auth/sms/verify", post(verify_sms))
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<Json<Value>> {
    validate_input(&input)?;
    let pool = state.pool()?;
    let payload = services::auth::register(pool, &state.config, &input).await?;
    Ok(response::ok(payload))
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<Value>> {
    validate_input(&input)?;
    let pool = state.pool()?;
    let payload = services::auth::login(pool, &state.config, &input).await?;
    Ok(response::ok(payload))
}

async fn send_sms(
    State(state): State<AppState>,
    Json(input): Json<SendSmsInput>,
) -> AppResult<Json<Value>> {
    validate_input(&input)?;
    let pool = state.pool()?;
    services::auth::send_sms_code(pool, &state.config, &input).await?;
    Ok(response::ok(serde_json::json!({ "sent": true })))
}

async fn verify_sms(
    State(state): State<AppState>,
    Json(input): Json<VerifySmsInput>,
) -> AppResult<Json<Value>> {
    validate_input(&input)?;
    let pool = state.pool()?;
    let valid = services::auth::verify_sms_code(pool, &input).await?;
    Ok(response::ok(serde_json::json!({ "valid": valid })))
}
