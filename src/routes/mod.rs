pub mod auth;
pub mod bills;
pub mod health;
pub mod meter_readings;
pub mod properties;
pub mod rooms;

use axum::Router;

use crate::state::AppState;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(properties::router())
        .merge(rooms::router())
        .merge(meter_readings::router())
        .merge(bills::router())
}
