//! Indian salary breakup.
//!
//! A CTC figure is split into Basic, HRA, a fixed conveyance allowance and a
//! remainder that is shared 60/40 between performance incentives and a
//! special allowance. Every component is rounded to two places before the
//! remainder is taken, half-to-even, which is what the generated documents
//! have always shown.

pub mod format;
pub mod words;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

const BASIC_RATE: Decimal = Decimal::from_parts(45, 0, 0, false, 2); // 0.45
const HRA_RATE: Decimal = Decimal::from_parts(225, 0, 0, false, 3); // 0.225
const PERFORMANCE_RATE: Decimal = Decimal::from_parts(60, 0, 0, false, 2); // 0.60
const SPECIAL_RATE: Decimal = Decimal::from_parts(40, 0, 0, false, 2); // 0.40

const CONVEYANCE_ANNUAL: Decimal = Decimal::from_parts(14400, 0, 0, false, 0);
const CONVEYANCE_MONTHLY: Decimal = Decimal::from_parts(1200, 0, 0, false, 0);

/// Whether an amount is a yearly or a monthly figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Annual,
    Monthly,
}

impl Period {
    pub fn conveyance(self) -> Decimal {
        match self {
            Period::Annual => CONVEYANCE_ANNUAL,
            Period::Monthly => CONVEYANCE_MONTHLY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SalaryBreakup {
    #[schema(value_type = String, example = "108000.00")]
    pub total: Decimal,
    #[schema(value_type = String, example = "48600.00")]
    pub basic: Decimal,
    #[schema(value_type = String, example = "24300.00")]
    pub hra: Decimal,
    #[schema(value_type = String, example = "14400.00")]
    pub conveyance: Decimal,
    #[schema(value_type = String, example = "12420.00")]
    pub performance_incentives: Decimal,
    #[schema(value_type = String, example = "8280.00")]
    pub special_allowance: Decimal,
}

/// Rounds a money amount to paise, half-to-even.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

impl SalaryBreakup {
    pub fn compute(amount: Decimal, period: Period) -> Self {
        let basic = round_money(amount * BASIC_RATE);
        let hra = round_money(amount * HRA_RATE);
        let conveyance = period.conveyance();
        let remainder = amount - basic - hra - conveyance;

        Self {
            total: amount,
            basic,
            hra,
            conveyance,
            performance_incentives: round_money(remainder * PERFORMANCE_RATE),
            special_allowance: round_money(remainder * SPECIAL_RATE),
        }
    }

    pub fn annual(amount: Decimal) -> Self {
        Self::compute(amount, Period::Annual)
    }

    pub fn monthly(amount: Decimal) -> Self {
        Self::compute(amount, Period::Monthly)
    }

    /// Monthly column of an offer letter.
    ///
    /// Basic, HRA and conveyance are twelfths of the annual components,
    /// and the rest of `per_month` is split 60/40 as usual.
    pub fn monthly_of(annual: &SalaryBreakup, per_month: Decimal) -> Self {
        let twelve = Decimal::from(12);
        let basic = round_money(annual.basic / twelve);
        let hra = round_money(annual.hra / twelve);
        let conveyance = round_money(annual.conveyance / twelve);
        let remainder = per_month - basic - hra - conveyance;

        Self {
            total: per_month,
            basic,
            hra,
            conveyance,
            performance_incentives: round_money(remainder * PERFORMANCE_RATE),
            special_allowance: round_money(remainder * SPECIAL_RATE),
        }
    }
}

/// Monthly share of an annual package.
pub fn monthly_from_annual(annual: Decimal) -> Decimal {
    round_money(annual / Decimal::from(12))
}
