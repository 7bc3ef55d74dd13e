use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = match &state.db_pool {
        Some(pool) => match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await {
            Ok(_) => "up",
            Err(_) => "down",
        },
        None => "not configured",
    };
    Json(json!({
        "status": "ok",
        "service": state.config.app_name,
        "database": database,
    }))
}
