use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::error::{AppError, AppResult};

/// One named fee on a room's schedule or a bill's breakdown.
/// Stored as a JSONB array at the persistence edge; the calculator only
/// ever sees this typed form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeLine {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Landlord,
    Tenant,
}

impl UserRole {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Landlord),
            2 => Some(Self::Tenant),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Self::Landlord => 1,
            Self::Tenant => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Vacant,
    Occupied,
    UnderRepair,
}

impl RoomStatus {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Vacant),
            2 => Some(Self::Occupied),
            3 => Some(Self::UnderRepair),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Self::Vacant => 1,
            Self::Occupied => 2,
            Self::UnderRepair => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Vacant => "vacant",
            Self::Occupied => "occupied",
            Self::UnderRepair => "under repair",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillStatus {
    Pending,
    Paid,
    Voided,
}

impl BillStatus {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Pending),
            2 => Some(Self::Paid),
            3 => Some(Self::Voided),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Self::Pending => 1,
            Self::Paid => 2,
            Self::Voided => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Voided => "voided",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Voided)
    }

    /// Pending is the only status that still accepts pay, void, edit or
    /// delete. The conditional `status = 1` updates at the persistence
    /// edge enforce the same gate.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub name: String,
    pub user_type: i16,
    pub status: i16,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Option<UserRole> {
        UserRole::from_code(self.user_type)
    }

    pub fn is_active(&self) -> bool {
        self.status == 1
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Property {
    pub id: i64,
    pub landlord_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub room_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Room {
    pub id: i64,
    pub property_id: i64,
    pub room_name: String,
    pub status: i16,
    pub tenant_id: Option<i64>,
    pub tenant_phone: Option<String>,
    pub rent_start_date: Option<NaiveDate>,
    pub monthly_rent: Decimal,
    pub cleaning_fee: Option<Decimal>,
    pub water_price: Option<Decimal>,
    pub electricity_price: Option<Decimal>,
    pub other_fees: Json<Vec<FeeLine>>,
    pub last_water_reading: Option<Decimal>,
    pub last_electricity_reading: Option<Decimal>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn room_status(&self) -> Option<RoomStatus> {
        RoomStatus::from_code(self.status)
    }

    pub fn is_occupied(&self) -> bool {
        self.status == RoomStatus::Occupied.code()
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MeterReading {
    pub id: i64,
    pub room_id: i64,
    pub reading_month: String,
    pub water_reading: Decimal,
    pub electricity_reading: Decimal,
    pub prev_water_reading: Decimal,
    pub prev_electricity_reading: Decimal,
    pub water_usage: Decimal,
    pub electricity_usage: Decimal,
    pub reading_date: NaiveDate,
    pub images: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Bill {
    pub id: i64,
    pub bill_no: String,
    pub room_id: i64,
    pub tenant_id: i64,
    pub bill_month: String,
    pub meter_reading_id: Option<i64>,
    pub rent_amount: Decimal,
    pub water_amount: Decimal,
    pub electricity_amount: Decimal,
    pub cleaning_amount: Decimal,
    pub other_details: Json<Vec<FeeLine>>,
    pub total_amount: Decimal,
    pub status: i16,
    pub paid_amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    pub fn bill_status(&self) -> Option<BillStatus> {
        BillStatus::from_code(self.status)
    }
}

/// Validates the `YYYY-MM` month format used by readings and bills.
pub fn validate_month(month: &str) -> AppResult<()> {
    let valid = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_ok()
        && month.len() == 7
        && month.as_bytes().get(4) == Some(&b'-');
    if valid {
        return Ok(());
    }
    Err(AppError::InvalidInput(format!(
        "'{month}' is not a valid month, expected YYYY-MM"
    )))
}

#[cfg(test)]
mod tests {
    use super::{validate_month, BillStatus, RoomStatus};

    #[test]
    fn month_format_is_strict() {
        assert!(validate_month("2024-07").is_ok());
        assert!(validate_month("2024-12").is_ok());
        assert!(validate_month("2024-13").is_err());
        assert!(validate_month("2024/07").is_err());
        assert!(validate_month("202407").is_err());
        assert!(validate_month("24-07").is_err());
    }

    #[test]
    fn status_codes_round_trip() {
        for status in [RoomStatus::Vacant, RoomStatus::Occupied, RoomStatus::UnderRepair] {
            assert_eq!(RoomStatus::from_code(status.code()), Some(status));
        }
        for status in [BillStatus::Pending, BillStatus::Paid, BillStatus::Voided] {
            assert_eq!(BillStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(RoomStatus::from_code(9), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!BillStatus::Pending.is_terminal());
        assert!(BillStatus::Paid.is_terminal());
        assert!(BillStatus::Voided.is_terminal());
    }

    #[test]
    fn only_a_pending_bill_is_open() {
        assert!(BillStatus::Pending.is_open());
        // Once settled a bill takes no further transition, so a second
        // payment attempt must fall through the gate.
        assert!(!BillStatus::Paid.is_open());
        assert!(!BillStatus::Voided.is_open());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(RoomStatus::Occupied.label(), "occupied");
        assert_eq!(BillStatus::Voided.label(), "voided");
    }
}
