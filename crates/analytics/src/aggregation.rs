//! Grouping of loosely typed tables by calendar bucket or category.

use crate::checked;
use crate::columns::{resolve_column, AMOUNT_COLUMNS, CATEGORY_COLUMNS};
use crate::error::AnalyticsError;
use crate::report::{CategoryShare, DailyTvl, Month, MonthlyRewards, TvlSummary};
use chrono::NaiveDateTime;
use core_types::{Table, Value};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Sums a column, skipping nulls. Non-numeric cells are a parse error.
pub fn sum_column(table: &Table, column: &str) -> Result<Decimal, AnalyticsError> {
    let Some(cells) = table.column(column) else {
        return Ok(Decimal::ZERO);
    };
    let mut total = Decimal::ZERO;
    for cell in cells.filter(|v| !v.is_null()) {
        total = checked::add(total, cell.to_decimal()?, "column sum")?;
    }
    Ok(total)
}

/// Extracts `(timestamp, value)` pairs. Rows with a null timestamp or value
/// are skipped; anything else that fails to parse is an error.
fn timed_values(
    table: &Table,
    time_col: &str,
    value_col: &str,
) -> Result<Vec<(NaiveDateTime, Decimal)>, AnalyticsError> {
    let mut out = Vec::with_capacity(table.len());
    for row in table.rows() {
        let (Some(ts), Some(value)) = (row.get(time_col), row.get(value_col)) else {
            continue;
        };
        if ts.is_null() || value.is_null() {
            continue;
        }
        out.push((ts.to_datetime()?, value.to_decimal()?));
    }
    Ok(out)
}

/// Sums per calendar month, in chronological order.
pub(crate) fn monthly_sums(
    table: &Table,
    time_col: &str,
    value_col: &str,
) -> Result<BTreeMap<Month, (Decimal, usize)>, AnalyticsError> {
    let mut buckets: BTreeMap<Month, (Decimal, usize)> = BTreeMap::new();
    for (ts, value) in timed_values(table, time_col, value_col)? {
        let entry = buckets.entry(Month::from(ts)).or_default();
        entry.0 = checked::add(entry.0, value, "monthly sum")?;
        entry.1 += 1;
    }
    Ok(buckets)
}

/// Buckets rows by calendar month and reports sum, count, mean and
/// month-over-month growth of `value_col`.
pub fn aggregate_by_month(
    table: &Table,
    time_col: &str,
    value_col: &str,
) -> Result<Vec<MonthlyRewards>, AnalyticsError> {
    let mut previous = None;
    monthly_sums(table, time_col, value_col)?
        .into_iter()
        .map(|(month, (total, count))| {
            let mom_growth = checked::relative_change(total, previous, "month-over-month growth")?;
            previous = Some(total);
            Ok(MonthlyRewards {
                month,
                total,
                count,
                mean: checked::div(total, Decimal::from(count), "monthly mean")?,
                mom_growth,
            })
        })
        .collect()
}

/// Reduces a TVL time series to one end-of-day value per calendar day.
///
/// Rows are ordered by timestamp first (stable, so equal timestamps keep
/// their row order) and the last value seen in each day wins.
pub fn aggregate_tvl_by_day(
    table: &Table,
    time_col: &str,
    tvl_col: &str,
) -> Result<Vec<DailyTvl>, AnalyticsError> {
    let mut points = timed_values(table, time_col, tvl_col)?;
    points.sort_by_key(|(ts, _)| *ts);

    let mut days: BTreeMap<chrono::NaiveDate, Decimal> = BTreeMap::new();
    for (ts, tvl) in points {
        days.insert(ts.date(), tvl);
    }

    let mut previous: Option<Decimal> = None;
    days.into_iter()
        .map(|(date, tvl)| {
            let change = previous
                .map(|p| checked::sub(tvl, p, "daily TVL change"))
                .transpose()?;
            let day = DailyTvl {
                date,
                tvl,
                change,
                change_pct: checked::relative_change(tvl, previous, "daily TVL change")?,
            };
            previous = Some(tvl);
            Ok(day)
        })
        .collect()
}

/// Latest, highest, lowest and mean end-of-day TVL. All zero for no data.
pub fn summarize_tvl(days: &[DailyTvl]) -> Result<TvlSummary, AnalyticsError> {
    let Some(last) = days.last() else {
        return Ok(TvlSummary::default());
    };
    let values = days.iter().map(|d| d.tvl);
    let total = checked::sum(values.clone(), "average TVL")?;
    Ok(TvlSummary {
        current: last.tvl,
        peak: values.clone().max().unwrap_or_default(),
        lowest: values.min().unwrap_or_default(),
        average: checked::div(total, Decimal::from(days.len()), "average TVL")?,
    })
}

/// Groups by category, sums the value column and ranks groups by total.
///
/// Both columns are auto-detected when not given (or not present). Groups
/// with equal totals keep the order in which they first appear.
pub fn aggregate_by_category(
    table: &Table,
    category_col: Option<&str>,
    value_col: Option<&str>,
) -> Result<Vec<CategoryShare>, AnalyticsError> {
    let category_col = resolve_column(table, category_col, CATEGORY_COLUMNS, false)?;
    let value_col = resolve_column(table, value_col, AMOUNT_COLUMNS, true)?;

    let mut groups: Vec<(String, Decimal)> = Vec::new();
    for row in table.rows() {
        let category = match row.get(&category_col) {
            Some(Value::Null) | None => continue,
            Some(v) => v.to_string(),
        };
        let amount = match row.get(&value_col) {
            Some(Value::Null) | None => Decimal::ZERO,
            Some(v) => v.to_decimal()?,
        };
        match groups.iter_mut().find(|(name, _)| *name == category) {
            Some((_, total)) => *total = checked::add(*total, amount, "category total")?,
            None => groups.push((category, amount)),
        }
    }

    // `sort_by` is stable.
    groups.sort_by(|a, b| b.1.cmp(&a.1));

    let grand_total = checked::sum(groups.iter().map(|(_, total)| *total), "category total")?;
    groups
        .into_iter()
        .map(|(category, total)| {
            Ok(CategoryShare {
                share_pct: checked::percent_of(total, grand_total, "category share")?,
                category,
                total,
            })
        })
        .collect()
}
