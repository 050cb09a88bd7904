use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// A calendar month, ordered chronologically and displayed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl From<NaiveDateTime> for Month {
    fn from(ts: NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The protocol P&L statement for a period.
///
/// Margins are percentages and are exactly zero when their denominator is
/// zero, so the statement can always be displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PLMetrics {
    // I. Revenue
    pub gross_rewards: Decimal,
    pub staker_rewards: Decimal,
    pub protocol_revenue: Decimal,

    // II. Operating expenses
    pub total_opex: Decimal,
    pub opex_personnel: Decimal,
    pub opex_audit: Decimal,
    pub opex_marketing: Decimal,
    pub opex_legal: Decimal,
    pub opex_other: Decimal,

    // III. Bottom line
    pub net_income: Decimal,
    pub gross_margin_pct: Decimal,
    pub net_margin_pct: Decimal,

    // IV. Assumptions used
    pub months: u32,
    pub fee_rate: Decimal,
}

impl PLMetrics {
    pub fn opex_allocations(&self) -> [Decimal; 5] {
        [
            self.opex_personnel,
            self.opex_audit,
            self.opex_marketing,
            self.opex_legal,
            self.opex_other,
        ]
    }

    pub fn is_profitable(&self) -> bool {
        self.net_income > Decimal::ZERO
    }
}

/// One month of the historic P&L.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPl {
    pub month: Month,
    pub gross_rewards: Decimal,
    pub protocol_revenue: Decimal,
    pub staker_rewards: Decimal,
    pub operating_costs: Decimal,
    pub net_income: Decimal,
    pub net_margin_pct: Decimal,
}

/// Sums over every month of a historic P&L.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub protocol_revenue: Decimal,
    pub operating_costs: Decimal,
    pub net_income: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPlReport {
    pub months: Vec<MonthlyPl>,
    pub totals: PeriodTotals,
}

/// Reward activity within one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRewards {
    pub month: Month,
    pub total: Decimal,
    pub count: usize,
    pub mean: Decimal,
    /// `(total - previous) / previous`. `None` for the first month, or when
    /// the previous month summed to zero.
    pub mom_growth: Option<Decimal>,
}

/// One group of a categorical breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub total: Decimal,
    /// Share of the grand total, in percent.
    pub share_pct: Decimal,
}

/// End-of-day TVL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTvl {
    pub date: NaiveDate,
    pub tvl: Decimal,
    /// Absolute change from the previous day. `None` for the first day.
    pub change: Option<Decimal>,
    /// Relative change from the previous day. `None` for the first day or
    /// when the previous day was zero.
    pub change_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TvlSummary {
    pub current: Decimal,
    pub peak: Decimal,
    pub lowest: Decimal,
    pub average: Decimal,
}

/// Outcome of the P&L at one candidate fee rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeScenario {
    pub fee_rate: Decimal,
    pub protocol_revenue: Decimal,
    pub net_income: Decimal,
    pub net_margin_pct: Decimal,
    pub breakeven: bool,
}

/// Protocol revenue from one category at its own fee rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRevenue {
    pub category: String,
    pub gross_rewards: Decimal,
    pub fee_rate: Decimal,
    pub protocol_revenue: Decimal,
}
