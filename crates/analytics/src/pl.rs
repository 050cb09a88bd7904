use crate::aggregation::{monthly_sums, sum_column};
use crate::checked;
use crate::columns::{resolve_column, AMOUNT_COLUMNS, CATEGORY_COLUMNS, TIME_COLUMNS};
use crate::error::AnalyticsError;
use crate::report::{
    CategoryRevenue, FeeScenario, MonthlyPl, MonthlyPlReport, PLMetrics, PeriodTotals,
};
use configuration::PLConfig;
use core_types::{Table, Value};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fee rates compared by [`PlCalculator::fee_sensitivity`] when none are given.
pub const DEFAULT_FEE_RATES: [Decimal; 4] = [dec!(0.05), dec!(0.10), dec!(0.15), dec!(0.20)];

/// A stateless calculator for the protocol P&L.
///
/// Holds a validated `PLConfig`; every method is a pure function of its
/// inputs and that configuration.
#[derive(Debug, Clone)]
pub struct PlCalculator {
    config: PLConfig,
}

impl PlCalculator {
    /// Validates the configuration and wraps it.
    ///
    /// An OpEx breakdown that does not sum to 1 is rejected here rather than
    /// producing a statement whose categories disagree with its total.
    pub fn new(config: PLConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PLConfig {
        &self.config
    }

    /// Computes the P&L statement for the whole table.
    ///
    /// # Arguments
    ///
    /// * `rewards` - Reward rows; only the amount column is read.
    /// * `amount_col` - Explicit amount column. Auto-detected when `None` or
    ///   absent from the table.
    pub fn calculate(
        &self,
        rewards: &Table,
        amount_col: Option<&str>,
    ) -> Result<PLMetrics, AnalyticsError> {
        let amount_col = resolve_column(rewards, amount_col, AMOUNT_COLUMNS, true)?;
        let gross_rewards = sum_column(rewards, &amount_col)?;
        tracing::debug!(column = %amount_col, %gross_rewards, "Summed gross rewards.");
        self.metrics_for_gross(gross_rewards)
    }

    /// The P&L arithmetic for a known gross reward figure.
    ///
    /// Fails with [`AnalyticsError::Overflow`] when a figure leaves the
    /// `Decimal` range, e.g. a net margin over a dust-sized revenue.
    pub fn metrics_for_gross(&self, gross_rewards: Decimal) -> Result<PLMetrics, AnalyticsError> {
        let c = &self.config;

        let protocol_revenue = checked::mul(gross_rewards, c.default_fee_rate, "protocol revenue")?;
        let staker_rewards = checked::sub(gross_rewards, protocol_revenue, "staker rewards")?;

        let total_opex = checked::mul(c.monthly_opex, Decimal::from(c.months), "total OpEx")?;
        let split = &c.opex_breakdown;
        let allocate = |share: Decimal| checked::mul(total_opex, share, "OpEx allocation");

        let net_income = checked::sub(protocol_revenue, total_opex, "net income")?;

        Ok(PLMetrics {
            gross_rewards,
            staker_rewards,
            protocol_revenue,
            total_opex,
            opex_personnel: allocate(split.personnel)?,
            opex_audit: allocate(split.audit)?,
            opex_marketing: allocate(split.marketing)?,
            opex_legal: allocate(split.legal)?,
            opex_other: allocate(split.other)?,
            net_income,
            gross_margin_pct: checked::percent_of(protocol_revenue, gross_rewards, "gross margin")?,
            net_margin_pct: checked::percent_of(net_income, protocol_revenue, "net margin")?,
            months: c.months,
            fee_rate: c.default_fee_rate,
        })
    }

    /// Historic P&L, one row per calendar month, charging the full monthly
    /// OpEx against every month that had rewards.
    pub fn calculate_monthly(
        &self,
        rewards: &Table,
        time_col: Option<&str>,
        amount_col: Option<&str>,
    ) -> Result<MonthlyPlReport, AnalyticsError> {
        let time_col = resolve_column(rewards, time_col, TIME_COLUMNS, false)?;
        let amount_col = resolve_column(rewards, amount_col, AMOUNT_COLUMNS, true)?;
        let fee_rate = self.config.default_fee_rate;
        let operating_costs = self.config.monthly_opex;

        let mut totals = PeriodTotals::default();
        let mut months: Vec<MonthlyPl> = Vec::new();
        for (month, (gross_rewards, _)) in monthly_sums(rewards, &time_col, &amount_col)? {
            let protocol_revenue = checked::mul(gross_rewards, fee_rate, "protocol revenue")?;
            let net_income = checked::sub(protocol_revenue, operating_costs, "net income")?;

            totals.protocol_revenue =
                checked::add(totals.protocol_revenue, protocol_revenue, "period totals")?;
            totals.operating_costs =
                checked::add(totals.operating_costs, operating_costs, "period totals")?;
            totals.net_income = checked::add(totals.net_income, net_income, "period totals")?;

            months.push(MonthlyPl {
                month,
                gross_rewards,
                protocol_revenue,
                staker_rewards: checked::sub(gross_rewards, protocol_revenue, "staker rewards")?,
                operating_costs,
                net_income,
                net_margin_pct: checked::percent_of(net_income, protocol_revenue, "net margin")?,
            });
        }

        tracing::debug!(months = months.len(), "Built monthly P&L.");
        Ok(MonthlyPlReport { months, totals })
    }

    /// Re-runs the P&L at each fee rate, keeping every other assumption.
    pub fn fee_sensitivity(
        &self,
        rewards: &Table,
        fee_rates: &[Decimal],
    ) -> Result<Vec<FeeScenario>, AnalyticsError> {
        let amount_col = resolve_column(rewards, None, AMOUNT_COLUMNS, true)?;
        let gross_rewards = sum_column(rewards, &amount_col)?;

        fee_rates
            .iter()
            .map(|&rate| {
                let metrics = PlCalculator::new(self.config.with_fee_rate(rate))?
                    .metrics_for_gross(gross_rewards)?;
                Ok(FeeScenario {
                    fee_rate: rate,
                    protocol_revenue: metrics.protocol_revenue,
                    net_income: metrics.net_income,
                    net_margin_pct: metrics.net_margin_pct,
                    breakeven: metrics.is_profitable(),
                })
            })
            .collect()
    }

    /// Protocol revenue per category, charging each category its own fee
    /// override (or the default rate). Categories appear in first-seen order.
    pub fn calculate_by_category(
        &self,
        rewards: &Table,
        category_col: Option<&str>,
        amount_col: Option<&str>,
    ) -> Result<Vec<CategoryRevenue>, AnalyticsError> {
        let category_col = resolve_column(rewards, category_col, CATEGORY_COLUMNS, false)?;
        let amount_col = resolve_column(rewards, amount_col, AMOUNT_COLUMNS, true)?;

        let mut out: Vec<CategoryRevenue> = Vec::new();
        for row in rewards.rows() {
            let category = match row.get(&category_col) {
                Some(Value::Null) | None => continue,
                Some(v) => v.to_string(),
            };
            let amount = match row.get(&amount_col) {
                Some(Value::Null) | None => continue,
                Some(v) => v.to_decimal()?,
            };
            match out.iter_mut().find(|c| c.category == category) {
                Some(entry) => {
                    entry.gross_rewards =
                        checked::add(entry.gross_rewards, amount, "category rewards")?;
                }
                None => out.push(CategoryRevenue {
                    fee_rate: self.config.fee_rate_for(&category),
                    category,
                    gross_rewards: amount,
                    protocol_revenue: Decimal::ZERO,
                }),
            }
        }
        for entry in &mut out {
            entry.protocol_revenue =
                checked::mul(entry.gross_rewards, entry.fee_rate, "category revenue")?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configuration::OpexBreakdown;

    fn calculator(fee_rate: Decimal, monthly_opex: Decimal, months: u32) -> PlCalculator {
        let config = PLConfig {
            default_fee_rate: fee_rate,
            monthly_opex,
            months,
            ..PLConfig::default()
        };
        PlCalculator::new(config).unwrap()
    }

    fn two_month_rewards() -> Table {
        Table::from_rows(
            vec!["time", "amount_usd"],
            vec![
                vec!["2024-01-15".into(), dec!(1000).into()],
                vec!["2024-02-10".into(), dec!(2000).into()],
            ],
        )
    }

    #[test]
    fn worked_example_matches() {
        let pl = calculator(dec!(0.10), dec!(474000), 2);
        let m = pl.calculate(&two_month_rewards(), None).unwrap();

        assert_eq!(m.gross_rewards, dec!(3000));
        assert_eq!(m.protocol_revenue, dec!(300));
        assert_eq!(m.staker_rewards, dec!(2700));
        assert_eq!(m.total_opex, dec!(948000));
        assert_eq!(m.net_income, dec!(-947700));
        assert_eq!(m.gross_margin_pct, dec!(10));
        assert_eq!(m.net_margin_pct, dec!(-315900));
    }

    #[test]
    fn fee_split_always_reconstructs_gross() {
        let table = Table::from_rows(
            vec!["rewards_usd"],
            vec![
                vec![dec!(1234.567).into()],
                vec![dec!(0.003).into()],
                vec![dec!(98765.4321).into()],
            ],
        );
        for step in 0..=20 {
            let rate = Decimal::from(step) / dec!(20);
            let m = calculator(rate, dec!(1000), 1).calculate(&table, None).unwrap();
            assert_eq!(m.protocol_revenue + m.staker_rewards, m.gross_rewards, "rate {rate}");
        }
    }

    #[test]
    fn opex_allocations_sum_to_total() {
        let splits = [
            OpexBreakdown::default(),
            OpexBreakdown {
                personnel: dec!(0.2),
                audit: dec!(0.2),
                marketing: dec!(0.2),
                legal: dec!(0.2),
                other: dec!(0.2),
            },
            OpexBreakdown {
                personnel: dec!(1),
                audit: dec!(0),
                marketing: dec!(0),
                legal: dec!(0),
                other: dec!(0),
            },
        ];
        for split in splits {
            let config = PLConfig {
                monthly_opex: dec!(123457.89),
                months: 7,
                opex_breakdown: split,
                ..PLConfig::default()
            };
            let m = PlCalculator::new(config).unwrap().metrics_for_gross(dec!(5000)).unwrap();
            let allocated: Decimal = m.opex_allocations().iter().sum();
            assert_eq!(allocated, m.total_opex);
        }
    }

    #[test]
    fn margins_are_zero_when_denominators_are_zero() {
        let pl = calculator(dec!(0.10), dec!(474000), 6);
        let m = pl.metrics_for_gross(Decimal::ZERO).unwrap();
        assert_eq!(m.gross_margin_pct, Decimal::ZERO);
        assert_eq!(m.net_margin_pct, Decimal::ZERO);

        // Non-zero gross but a zero fee: revenue is zero, so only the net margin is zeroed.
        let m = calculator(Decimal::ZERO, dec!(474000), 6)
            .metrics_for_gross(dec!(1000))
            .unwrap();
        assert_eq!(m.gross_margin_pct, Decimal::ZERO);
        assert_eq!(m.net_margin_pct, Decimal::ZERO);
        assert_eq!(m.net_income, dec!(-2844000));
    }

    #[test]
    fn missing_amount_column_is_reported() {
        let table = Table::from_rows(vec!["network"], vec![vec!["Eth".into()]]);
        let err = calculator(dec!(0.1), dec!(1), 1).calculate(&table, None).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingColumn { .. }));
    }

    #[test]
    fn unbalanced_breakdown_is_rejected() {
        let config = PLConfig {
            opex_breakdown: OpexBreakdown {
                other: dec!(0.5),
                ..OpexBreakdown::default()
            },
            ..PLConfig::default()
        };
        assert!(matches!(
            PlCalculator::new(config),
            Err(AnalyticsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn monthly_pl_charges_opex_per_month() {
        let pl = calculator(dec!(0.10), dec!(474000), 6);
        let report = pl.calculate_monthly(&two_month_rewards(), None, None).unwrap();

        assert_eq!(report.months.len(), 2);
        assert_eq!(report.months[0].month.to_string(), "2024-01");
        assert_eq!(report.months[0].protocol_revenue, dec!(100));
        assert_eq!(report.months[0].staker_rewards, dec!(900));
        assert_eq!(report.months[1].net_income, dec!(-473800));
        assert_eq!(report.totals.operating_costs, dec!(948000));
        assert_eq!(report.totals.net_income, dec!(-947700));
    }

    #[test]
    fn fee_sensitivity_flags_breakeven() {
        let table = Table::from_rows(vec!["amount"], vec![vec![dec!(30000000).into()]]);
        let pl = calculator(dec!(0.10), dec!(474000), 6);
        let scenarios = pl.fee_sensitivity(&table, &DEFAULT_FEE_RATES).unwrap();

        assert_eq!(scenarios.len(), 4);
        // 2.844M of OpEx over six months.
        assert!(!scenarios[0].breakeven);
        assert_eq!(scenarios[0].protocol_revenue, dec!(1500000));
        assert!(scenarios[1].breakeven);
        assert_eq!(scenarios[3].net_income, dec!(3156000));
    }

    #[test]
    fn fee_sensitivity_rejects_rates_above_one() {
        let table = Table::from_rows(vec!["amount"], vec![vec![dec!(1).into()]]);
        let pl = calculator(dec!(0.10), dec!(1), 1);
        assert!(pl.fee_sensitivity(&table, &[dec!(1.2)]).is_err());
    }

    #[test]
    fn category_revenue_uses_overrides() {
        let table = Table::from_rows(
            vec!["vault", "amount_usd"],
            vec![
                vec!["Insurance".into(), dec!(1000).into()],
                vec!["Relay".into(), dec!(2000).into()],
                vec!["Insurance".into(), dec!(1000).into()],
                vec!["Other".into(), dec!(100).into()],
            ],
        );
        let pl = calculator(dec!(0.10), dec!(1), 1);
        let by_category = pl.calculate_by_category(&table, None, None).unwrap();

        assert_eq!(by_category.len(), 3);
        assert_eq!(by_category[0].category, "Insurance");
        assert_eq!(by_category[0].protocol_revenue, dec!(300));
        assert_eq!(by_category[1].protocol_revenue, dec!(100));
        assert_eq!(by_category[2].fee_rate, dec!(0.10));
    }

    #[test]
    fn dust_revenue_net_margin_is_an_overflow_error() {
        let table = Table::from_csv("time,amount_usd\n2024-01-15,0.00000000000000000001\n").unwrap();
        let err = calculator(dec!(0.10), dec!(474000), 6).calculate(&table, None).unwrap_err();
        assert!(matches!(err, AnalyticsError::Overflow("net margin")));
    }

    #[test]
    fn text_amount_is_a_parse_error() {
        let table = Table::from_rows(
            vec!["time", "amount_usd"],
            vec![
                vec!["2024-01-15".into(), dec!(1000).into()],
                vec!["2024-02-10".into(), "n/a".into()],
            ],
        );
        let pl = calculator(dec!(0.10), dec!(474000), 6);
        assert!(matches!(pl.calculate(&table, None), Err(AnalyticsError::Parse(_))));
        assert!(matches!(
            pl.calculate_monthly(&table, None, None),
            Err(AnalyticsError::Parse(_))
        ));
    }
}
