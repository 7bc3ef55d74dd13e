//! The bill calculator. Pure and deterministic: the same schedule, usage
//! and overrides always produce the same breakdown, so regenerating a
//! bill is safe.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::domain::{FeeLine, Room};

/// Metered consumption for one billing month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Usage {
    pub water: Decimal,
    pub electricity: Decimal,
}

/// The fee inputs the calculator prices from, normally a room's schedule.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    pub monthly_rent: Decimal,
    pub cleaning_fee: Option<Decimal>,
    pub water_price: Option<Decimal>,
    pub electricity_price: Option<Decimal>,
    pub other_fees: Vec<FeeLine>,
}

impl From<&Room> for FeeSchedule {
    fn from(room: &Room) -> Self {
        Self {
            monthly_rent: room.monthly_rent,
            cleaning_fee: room.cleaning_fee,
            water_price: room.water_price,
            electricity_price: room.electricity_price,
            other_fees: room.other_fees.0.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BillBreakdown {
    pub rent_amount: Decimal,
    pub water_amount: Decimal,
    pub electricity_amount: Decimal,
    pub cleaning_amount: Decimal,
    pub other_details: Vec<FeeLine>,
    pub total_amount: Decimal,
}

/// Half-up rounding to 2 decimal places, applied per component and once
/// more on the final total.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn compute(
    schedule: &FeeSchedule,
    usage: Option<&Usage>,
    rent_override: Option<Decimal>,
    other_override: Option<&[FeeLine]>,
) -> BillBreakdown {
    let rent_amount = round_money(rent_override.unwrap_or(schedule.monthly_rent));

    // A metered component prices to zero unless both a unit price and a
    // usage figure are present.
    let water_amount = match (schedule.water_price, usage) {
        (Some(price), Some(usage)) => round_money(price * usage.water),
        _ => Decimal::ZERO,
    };
    let electricity_amount = match (schedule.electricity_price, usage) {
        (Some(price), Some(usage)) => round_money(price * usage.electricity),
        _ => Decimal::ZERO,
    };

    let cleaning_amount = round_money(schedule.cleaning_fee.unwrap_or(Decimal::ZERO));

    let other_details: Vec<FeeLine> = other_override
        .map(|lines| lines.to_vec())
        .unwrap_or_else(|| schedule.other_fees.clone())
        .into_iter()
        .map(|line| FeeLine {
            name: line.name,
            amount: round_money(line.amount),
        })
        .collect();

    let other_total: Decimal = other_details.iter().map(|line| line.amount).sum();
    let total_amount = round_money(
        rent_amount + water_amount + electricity_amount + cleaning_amount + other_total,
    );

    BillBreakdown {
        rent_amount,
        water_amount,
        electricity_amount,
        cleaning_amount,
        other_details,
        total_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn schedule() -> FeeSchedule {
        FeeSchedule {
            monthly_rent: dec("1500"),
            cleaning_fee: Some(dec("50")),
            water_price: Some(dec("2.50")),
            electricity_price: Some(dec("1.20")),
            other_fees: vec![],
        }
    }

    #[test]
    fn full_breakdown_with_usage() {
        let usage = Usage {
            water: dec("20"),
            electricity: dec("100"),
        };
        let breakdown = compute(&schedule(), Some(&usage), None, None);
        assert_eq!(breakdown.rent_amount, dec("1500.00"));
        assert_eq!(breakdown.water_amount, dec("50.00"));
        assert_eq!(breakdown.electricity_amount, dec("120.00"));
        assert_eq!(breakdown.cleaning_amount, dec("50.00"));
        assert_eq!(breakdown.total_amount, dec("1720.00"));
    }

    #[test]
    fn metered_components_are_zero_without_usage() {
        let breakdown = compute(&schedule(), None, None, None);
        assert_eq!(breakdown.water_amount, Decimal::ZERO);
        assert_eq!(breakdown.electricity_amount, Decimal::ZERO);
        assert_eq!(breakdown.total_amount, dec("1550.00"));
    }

    #[test]
    fn metered_components_are_zero_without_price() {
        let mut schedule = schedule();
        schedule.water_price = None;
        schedule.electricity_price = None;
        let usage = Usage {
            water: dec("10"),
            electricity: dec("100"),
        };
        let breakdown = compute(&schedule, Some(&usage), None, None);
        assert_eq!(breakdown.water_amount, Decimal::ZERO);
        assert_eq!(breakdown.electricity_amount, Decimal::ZERO);
    }

    #[test]
    fn rounds_half_up() {
        let mut schedule = schedule();
        schedule.water_price = Some(dec("2.5"));
        let usage = Usage {
            water: dec("1.25"),
            electricity: Decimal::ZERO,
        };
        // 2.5 * 1.25 = 3.125 -> 3.13
        let breakdown = compute(&schedule, Some(&usage), None, None);
        assert_eq!(breakdown.water_amount, dec("3.13"));
    }

    #[test]
    fn rent_override_replaces_schedule_rent() {
        let breakdown = compute(&schedule(), None, Some(dec("1200")), None);
        assert_eq!(breakdown.rent_amount, dec("1200.00"));
        assert_eq!(breakdown.total_amount, dec("1250.00"));
    }

    #[test]
    fn other_fees_are_summed_in_order() {
        let mut schedule = schedule();
        schedule.other_fees = vec![
            FeeLine {
                name: "internet".to_string(),
                amount: dec("30"),
            },
            FeeLine {
                name: "parking".to_string(),
                amount: dec("80"),
            },
        ];
        let breakdown = compute(&schedule, None, None, None);
        assert_eq!(breakdown.other_details.len(), 2);
        assert_eq!(breakdown.other_details[0].name, "internet");
        assert_eq!(breakdown.total_amount, dec("1660.00"));
    }

    #[test]
    fn other_override_replaces_schedule_fees() {
        let mut schedule = schedule();
        schedule.other_fees = vec![FeeLine {
            name: "internet".to_string(),
            amount: dec("30"),
        }];
        let override_fees = vec![FeeLine {
            name: "repair".to_string(),
            amount: dec("15"),
        }];
        let breakdown = compute(&schedule, None, None, Some(&override_fees));
        assert_eq!(breakdown.other_details.len(), 1);
        assert_eq!(breakdown.other_details[0].name, "repair");
        assert_eq!(breakdown.total_amount, dec("1565.00"));
    }

    #[test]
    fn deterministic_and_components_sum_to_total() {
        let usage = Usage {
            water: dec("7.3"),
            electricity: dec("41.8"),
        };
        let schedule = schedule();
        let first = compute(&schedule, Some(&usage), None, None);
        let second = compute(&schedule, Some(&usage), None, None);
        assert_eq!(first.total_amount, second.total_amount);

        let other_total: Decimal = first.other_details.iter().map(|line| line.amount).sum();
        let sum = first.rent_amount
            + first.water_amount
            + first.electricity_amount
            + first.cleaning_amount
            + other_total;
        assert!((first.total_amount - sum).abs() < dec("0.005"));
    }
}
