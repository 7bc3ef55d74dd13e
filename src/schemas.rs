use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::domain::FeeLine;
use crate::error::{AppError, AppResult};

pub fn validate_input<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|err| AppError::InvalidInput(err.to_string()))
}

fn default_current() -> i64 {
    1
}

fn default_size() -> i64 {
    10
}

/// Clamped pagination bounds: (current, size, offset). Flattened query
/// structs break number parsing in the urlencoded deserializer, so each
/// page query carries `current`/`size` directly and funnels through here.
pub fn page_bounds(current: i64, size: i64) -> (i64, i64, i64) {
    let size = size.clamp(1, 100);
    let current = current.max(1);
    (current, size, (current - 1) * size)
}

// ---- auth ----

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    #[validate(length(min = 6, max = 64))]
    pub password: String,
    pub confirm_password: String,
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 4, max = 8))]
    pub sms_code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    /// Landlord login.
    pub password: Option<String>,
    /// Tenant login.
    pub sms_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendSmsInput {
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 20))]
    pub purpose: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifySmsInput {
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 20))]
    pub purpose: String,
    #[validate(length(min = 4, max = 8))]
    pub code: String,
}

// ---- properties ----

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePropertyInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePropertyInput {
    pub id: i64,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

// ---- rooms ----

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomInput {
    pub property_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub room_name: String,
    pub monthly_rent: Decimal,
    pub cleaning_fee: Option<Decimal>,
    pub water_price: Option<Decimal>,
    pub electricity_price: Option<Decimal>,
    #[serde(default)]
    pub other_fees: Vec<FeeLine>,
    #[validate(length(max = 255))]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoomInput {
    pub id: i64,
    #[validate(length(min = 1, max = 50))]
    pub room_name: Option<String>,
    pub status: Option<i16>,
    #[validate(length(max = 255))]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFeesInput {
    pub room_id: i64,
    pub monthly_rent: Option<Decimal>,
    pub cleaning_fee: Option<Decimal>,
    pub water_price: Option<Decimal>,
    pub electricity_price: Option<Decimal>,
    pub other_fees: Option<Vec<FeeLine>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BindTenantInput {
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    #[validate(length(max = 50))]
    pub tenant_name: Option<String>,
    pub rent_start_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRoomStatusInput {
    pub room_ids: Vec<i64>,
    pub status: i16,
}

#[derive(Debug, Deserialize)]
pub struct RoomPageQuery {
    #[serde(default = "default_current")]
    pub current: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    pub property_id: Option<i64>,
    pub status: Option<i16>,
    pub keyword: Option<String>,
}

// ---- meter readings ----

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReadingInput {
    pub room_id: i64,
    #[validate(length(equal = 7))]
    pub reading_month: String,
    pub water_reading: Decimal,
    pub electricity_reading: Decimal,
    pub reading_date: Option<NaiveDate>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReadingInput {
    pub id: i64,
    pub water_reading: Decimal,
    pub electricity_reading: Decimal,
    pub reading_date: Option<NaiveDate>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchReadingItem {
    pub room_id: i64,
    pub water_reading: Decimal,
    pub electricity_reading: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchReadingsInput {
    #[validate(length(equal = 7))]
    pub reading_month: String,
    pub items: Vec<BatchReadingItem>,
    pub reading_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReadingPageQuery {
    #[serde(default = "default_current")]
    pub current: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    pub room_id: Option<i64>,
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReadingExistsQuery {
    pub room_id: i64,
    pub month: String,
}

// ---- bills ----

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBillInput {
    pub room_id: i64,
    #[validate(length(equal = 7))]
    pub bill_month: String,
    pub meter_reading_id: Option<i64>,
    pub rent_amount: Option<Decimal>,
    pub other_details: Option<Vec<FeeLine>>,
    #[validate(length(max = 255))]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBillInput {
    pub id: i64,
    pub rent_amount: Option<Decimal>,
    pub other_details: Option<Vec<FeeLine>>,
    #[validate(length(max = 255))]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchGenerateInput {
    #[validate(length(equal = 7))]
    pub bill_month: String,
    pub room_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PayBillInput {
    pub paid_amount: Decimal,
    #[validate(length(max = 20))]
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BillPageQuery {
    #[serde(default = "default_current")]
    pub current: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    pub room_id: Option<i64>,
    pub month: Option<String>,
    pub status: Option<i16>,
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BillExistsQuery {
    pub room_id: i64,
    pub month: String,
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub month: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::page_bounds;

    #[test]
    fn page_bounds_are_clamped() {
        assert_eq!(page_bounds(0, 500), (1, 100, 0));
        assert_eq!(page_bounds(3, 20), (3, 20, 40));
        assert_eq!(page_bounds(-5, 0), (1, 1, 0));
    }
}
