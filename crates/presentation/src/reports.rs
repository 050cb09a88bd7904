//! Builders that lay out each analytics report as a [`Grid`].

use crate::format::{growth, number, percent, rate, usd, usd_billions, usd_millions};
use crate::grid::Grid;
use analytics::{
    BaselineMetrics, CategoryRevenue, CategoryShare, DailyTvl, FeeScenario, MonthlyPlReport,
    MonthlyRewards, PLMetrics, ScenarioRecord, ScenarioSummary, TvlSummary,
};
use core_types::Table;
use rust_decimal::Decimal;

const RULE: &str = "─────────────────────────";
const DOUBLE_RULE: &str = "═════════════════════════";

/// Raw TVL series are in dollars.
const DOLLARS_PER_BILLION: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| (*c).to_string()).collect()
}

/// A cost shown as a deduction.
fn deduction(value: Decimal) -> String {
    usd(-value)
}

fn share_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        part / whole * Decimal::ONE_HUNDRED
    }
}

/// The P&L statement as accounting line items.
pub fn pl_statement(m: &PLMetrics) -> Grid {
    let mut grid = Grid::new(
        format!("PROTOCOL P&L ({} months)", m.months),
        vec!["Line Item", "Amount"],
    )
    .numeric([1]);

    let staker_share = rate(Decimal::ONE - m.fee_rate);
    let opex_lines = [
        ("Personnel & Contractors", m.opex_personnel),
        ("Audit & Security", m.opex_audit),
        ("Marketing & BD", m.opex_marketing),
        ("Legal & Professional", m.opex_legal),
        ("Other Operating", m.opex_other),
    ];

    grid.push_row(row(&["REVENUE", ""]));
    grid.push_row(vec!["Gross Rewards Generated".into(), usd(m.gross_rewards)]);
    grid.push_row(vec![
        format!("Less: Staker Distribution ({staker_share})"),
        deduction(m.staker_rewards),
    ]);
    grid.push_row(row(&[RULE, ""]));
    grid.push_row(vec![
        format!("Protocol Revenue ({})", rate(m.fee_rate)),
        usd(m.protocol_revenue),
    ]);
    grid.push_row(row(&["", ""]));
    grid.push_row(row(&["OPERATING EXPENSES", ""]));
    for (label, amount) in opex_lines {
        let share = number(share_of(amount, m.total_opex), 0);
        grid.push_row(vec![format!("{label} ({share}%)"), deduction(amount)]);
    }
    grid.push_row(row(&[RULE, ""]));
    grid.push_row(vec!["Total Operating Expenses".into(), deduction(m.total_opex)]);
    grid.push_row(row(&["", ""]));
    grid.push_row(row(&[DOUBLE_RULE, ""]));
    grid.push_row(vec!["NET INCOME".into(), usd(m.net_income)]);
    grid.push_row(row(&["", ""]));
    grid.push_row(row(&["MARGINS", ""]));
    grid.push_row(vec!["Gross Margin".into(), percent(m.gross_margin_pct)]);
    grid.push_row(vec!["Net Margin".into(), percent(m.net_margin_pct)]);
    grid
}

pub fn monthly_pl(report: &MonthlyPlReport) -> Grid {
    let mut grid = Grid::new(
        "MONTHLY P&L",
        vec!["Month", "Gross Rewards", "Protocol Revenue", "Operating Costs", "Net Income", "Net Margin"],
    )
    .numeric(1..6);

    for m in &report.months {
        grid.push_row(vec![
            m.month.to_string(),
            usd(m.gross_rewards),
            usd(m.protocol_revenue),
            deduction(m.operating_costs),
            usd(m.net_income),
            percent(m.net_margin_pct),
        ]);
    }

    let t = &report.totals;
    grid.push_row(vec![
        "TOTAL".into(),
        String::new(),
        usd(t.protocol_revenue),
        deduction(t.operating_costs),
        usd(t.net_income),
        String::new(),
    ]);
    grid
}

pub fn monthly_rewards(months: &[MonthlyRewards]) -> Grid {
    let mut grid = Grid::new(
        "REWARDS BY MONTH",
        vec!["Month", "Total", "Distributions", "Average", "MoM Growth"],
    )
    .numeric(1..5);

    for m in months {
        grid.push_row(vec![
            m.month.to_string(),
            usd(m.total),
            m.count.to_string(),
            usd(m.mean),
            growth(m.mom_growth),
        ]);
    }
    grid
}

/// The largest categories, at most `limit` of them.
pub fn top_categories(title: &str, shares: &[CategoryShare], limit: usize) -> Grid {
    let mut grid = Grid::new(title, vec!["Category", "Total", "Share"]).numeric([1, 2]);
    for share in shares.iter().take(limit) {
        grid.push_row(vec![
            share.category.clone(),
            usd(share.total),
            percent(share.share_pct),
        ]);
    }
    grid
}

pub fn category_revenue(categories: &[CategoryRevenue]) -> Grid {
    let mut grid = Grid::new(
        "REVENUE BY CATEGORY",
        vec!["Category", "Gross Rewards", "Fee Rate", "Protocol Revenue"],
    )
    .numeric(1..4);

    for c in categories {
        grid.push_row(vec![
            c.category.clone(),
            usd(c.gross_rewards),
            rate(c.fee_rate),
            usd(c.protocol_revenue),
        ]);
    }
    grid
}

pub fn tvl_summary(summary: &TvlSummary) -> Grid {
    let mut grid = Grid::new("TVL SUMMARY", vec!["Metric", "Value"]).numeric([1]);
    for (label, value) in [
        ("Current", summary.current),
        ("Peak", summary.peak),
        ("Lowest", summary.lowest),
        ("Average", summary.average),
    ] {
        grid.push_row(vec![label.to_string(), usd_billions(value / DOLLARS_PER_BILLION)]);
    }
    grid
}

/// The most recent `limit` days, oldest first.
pub fn recent_tvl(days: &[DailyTvl], limit: usize) -> Grid {
    let mut grid = Grid::new("DAILY TVL", vec!["Date", "TVL", "Change", "Growth"]).numeric(1..4);
    let start = days.len().saturating_sub(limit);
    for day in &days[start..] {
        grid.push_row(vec![
            day.date.to_string(),
            usd(day.tvl),
            day.change.map(usd).unwrap_or_else(|| "-".to_string()),
            growth(day.change_pct),
        ]);
    }
    grid
}

pub fn fee_scenarios(scenarios: &[FeeScenario]) -> Grid {
    let mut grid = Grid::new(
        "FEE RATE SENSITIVITY",
        vec!["Fee Rate", "Protocol Revenue", "Net Income", "Net Margin", "Breakeven"],
    )
    .numeric(1..4);

    for s in scenarios {
        grid.push_row(vec![
            rate(s.fee_rate),
            usd(s.protocol_revenue),
            usd(s.net_income),
            percent(s.net_margin_pct),
            if s.breakeven { "Yes" } else { "No" }.to_string(),
        ]);
    }
    grid
}

/// Every scenario year with its revenue streams, in $M.
pub fn scenario_model(records: &[ScenarioRecord]) -> Grid {
    let mut headers = vec!["Scenario", "Year", "TVL", "Networks"];
    headers.extend(["Relay", "Insurance", "Credit", "DA", "Derivatives"]);
    headers.extend(["Revenue", "OpEx", "EBITDA", "Margin"]);
    let mut grid = Grid::new("REVENUE SCENARIOS ($M)", headers).numeric(1..13);

    for r in records {
        let mut cells = vec![
            r.scenario.to_string(),
            r.year.to_string(),
            usd_billions(r.tvl),
            r.networks.to_string(),
        ];
        cells.extend(r.streams().iter().map(|(_, v)| usd_millions(*v)));
        cells.extend([
            usd_millions(r.total_revenue),
            usd_millions(r.opex),
            usd_millions(r.ebitda),
            percent(r.ebitda_margin_pct),
        ]);
        grid.push_row(cells);
    }
    grid
}

pub fn scenario_summary(summaries: &[ScenarioSummary]) -> Grid {
    let mut grid = Grid::new(
        "SCENARIO SUMMARY",
        vec!["Scenario", "Year", "TVL", "Networks", "Revenue", "EBITDA", "Margin", "vs Target"],
    )
    .numeric(1..8);

    for s in summaries {
        grid.push_row(vec![
            s.scenario.to_string(),
            s.year.to_string(),
            usd_billions(s.tvl),
            s.networks.to_string(),
            usd_millions(s.revenue),
            usd_millions(s.ebitda),
            percent(s.ebitda_margin_pct),
            s.vs_target_pct.map(percent).unwrap_or_else(|| "-".to_string()),
        ]);
    }
    grid
}

pub fn baseline(metrics: &BaselineMetrics) -> Grid {
    let mut grid = Grid::new("BASELINE", vec!["Metric", "Value"]).numeric([1]);
    grid.push_row(vec!["Current TVL".into(), usd_billions(metrics.current_tvl)]);
    grid.push_row(vec!["Active Networks".into(), metrics.active_networks.to_string()]);
    grid.push_row(vec!["Total Rewards".into(), usd_millions(metrics.total_rewards)]);
    grid.push_row(vec!["Operators".into(), metrics.operator_count.to_string()]);
    grid
}

/// The first `limit` rows of a dataset, as fetched.
pub fn raw_table(title: &str, table: &Table, limit: usize) -> Grid {
    let mut grid = Grid::new(title, table.columns().to_vec());
    for r in table.rows().take(limit) {
        grid.push_row(r.values().iter().map(ToString::to_string).collect());
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::scenario::build_model;
    use analytics::{Month, PlCalculator};
    use chrono::NaiveDate;
    use configuration::{PLConfig, ScenarioParams};
    use core_types::Value;
    use rust_decimal_macros::dec;

    fn worked_example() -> PLMetrics {
        let config = PLConfig {
            months: 2,
            ..PLConfig::default()
        };
        PlCalculator::new(config)
            .unwrap()
            .metrics_for_gross(dec!(3000))
            .unwrap()
    }

    #[test]
    fn statement_shows_deductions_in_parentheses() {
        let grid = pl_statement(&worked_example());
        let text = grid.to_text();

        assert!(text.contains("PROTOCOL P&L (2 months)"));
        assert!(grid.rows.contains(&vec!["Gross Rewards Generated".to_string(), "$3,000".to_string()]));
        assert!(grid.rows.contains(&vec!["Less: Staker Distribution (90%)".to_string(), "($2,700)".to_string()]));
        assert!(grid.rows.contains(&vec!["Protocol Revenue (10%)".to_string(), "$300".to_string()]));
        assert!(grid.rows.contains(&vec!["Personnel & Contractors (54%)".to_string(), "($511,920)".to_string()]));
        assert!(grid.rows.contains(&vec!["Total Operating Expenses".to_string(), "($948,000)".to_string()]));
        assert!(grid.rows.contains(&vec!["NET INCOME".to_string(), "($947,700)".to_string()]));
        assert!(grid.rows.contains(&vec!["Gross Margin".to_string(), "10.0%".to_string()]));
    }

    #[test]
    fn first_month_growth_is_a_dash() {
        let months = vec![
            MonthlyRewards {
                month: Month { year: 2024, month: 1 },
                total: dec!(1000),
                count: 1,
                mean: dec!(1000),
                mom_growth: None,
            },
            MonthlyRewards {
                month: Month { year: 2024, month: 2 },
                total: dec!(2000),
                count: 2,
                mean: dec!(1000),
                mom_growth: Some(dec!(1)),
            },
        ];
        let grid = monthly_rewards(&months);
        assert_eq!(grid.rows[0][4], "-");
        assert_eq!(grid.rows[1][4], "+100.0%");
        assert_eq!(grid.rows[1][0], "2024-02");
    }

    #[test]
    fn category_list_is_capped() {
        let shares: Vec<CategoryShare> = (0..15)
            .map(|i| CategoryShare {
                category: format!("net-{i}"),
                total: Decimal::from(100 - i),
                share_pct: Decimal::ONE,
            })
            .collect();
        assert_eq!(top_categories("TOP NETWORKS", &shares, 10).rows.len(), 10);
    }

    #[test]
    fn recent_tvl_keeps_the_tail() {
        let days: Vec<DailyTvl> = (1..=25)
            .map(|d| DailyTvl {
                date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                tvl: Decimal::from(d),
                change: None,
                change_pct: None,
            })
            .collect();
        let grid = recent_tvl(&days, 20);
        assert_eq!(grid.rows.len(), 20);
        assert_eq!(grid.rows[0][0], "2024-01-06");
    }

    #[test]
    fn tvl_summary_is_shown_in_billions() {
        let summary = TvlSummary {
            current: dec!(1320000000),
            peak: dec!(1716000000),
            lowest: dec!(990000000),
            average: dec!(1250000000),
        };
        let grid = tvl_summary(&summary);
        assert_eq!(grid.rows[0], vec!["Current".to_string(), "$1.32B".to_string()]);
        assert_eq!(grid.rows[1][1], "$1.72B");
        assert_eq!(grid.rows[2][1], "$0.99B");
    }

    #[test]
    fn scenario_model_has_a_row_per_record() {
        let records = build_model(&ScenarioParams::default()).unwrap();
        let grid = scenario_model(&records);
        assert_eq!(grid.rows.len(), records.len());
        assert_eq!(grid.headers.len(), 13);
        assert!(grid.rows.iter().all(|r| r.len() == 13));
        assert!(grid.rows[0][0].contains("Downside"));
    }

    #[test]
    fn raw_tables_render_nulls_and_text() {
        let table = Table::from_rows(
            vec!["network", "amount"],
            vec![
                vec![Value::from("relay"), dec!(12.5).into()],
                vec![Value::Null, dec!(1).into()],
            ],
        );
        let grid = raw_table("rewards", &table, 1);
        assert_eq!(grid.headers, ["network", "amount"]);
        assert_eq!(grid.rows, vec![vec!["relay".to_string(), "12.5".to_string()]]);
    }
}
