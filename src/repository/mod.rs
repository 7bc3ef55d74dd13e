pub mod bills;
pub mod meter_readings;
pub mod properties;
pub mod rooms;
pub mod sms_codes;
pub mod users;

use crate::error::AppError;

/// Maps driver errors to the domain taxonomy. Unique violations become
/// `Duplicate` so the indexes stay the authoritative guard even when a
/// fast-path existence check races.
pub(crate) fn map_db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return AppError::Duplicate("a record with the same key already exists".to_string());
        }
        if db_err.code().as_deref() == Some("23503") {
            return AppError::InvalidState("a related record still references this one".to_string());
        }
    }
    AppError::Internal(format!("database error: {err}"))
}
