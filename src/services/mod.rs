pub mod auth;
pub mod billing;
pub mod bills;
pub mod meter_readings;
pub mod properties;
pub mod rooms;
