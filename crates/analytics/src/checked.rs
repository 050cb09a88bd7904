//! Overflow-checked `Decimal` arithmetic.
//!
//! The `Decimal` operators panic when a result leaves the representable
//! range, which data-derived figures can reach (dust amounts as divisors,
//! very large raw sums). Every figure computed from table data goes through
//! these helpers instead, each labelled with what was being computed.

use crate::error::AnalyticsError;
use rust_decimal::Decimal;

pub(crate) fn add(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, AnalyticsError> {
    a.checked_add(b).ok_or(AnalyticsError::Overflow(what))
}

pub(crate) fn sub(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, AnalyticsError> {
    a.checked_sub(b).ok_or(AnalyticsError::Overflow(what))
}

pub(crate) fn mul(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, AnalyticsError> {
    a.checked_mul(b).ok_or(AnalyticsError::Overflow(what))
}

/// Callers guard against a zero divisor; a `None` here is an overflow.
pub(crate) fn div(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, AnalyticsError> {
    a.checked_div(b).ok_or(AnalyticsError::Overflow(what))
}

pub(crate) fn sum<I>(values: I, what: &'static str) -> Result<Decimal, AnalyticsError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| add(acc, v, what))
}

/// Product of several factors.
pub(crate) fn product<I>(factors: I, what: &'static str) -> Result<Decimal, AnalyticsError>
where
    I: IntoIterator<Item = Decimal>,
{
    factors
        .into_iter()
        .try_fold(Decimal::ONE, |acc, v| mul(acc, v, what))
}

/// `part / whole * 100`, or exactly zero when `whole` is zero.
pub(crate) fn percent_of(
    part: Decimal,
    whole: Decimal,
    what: &'static str,
) -> Result<Decimal, AnalyticsError> {
    if whole.is_zero() {
        return Ok(Decimal::ZERO);
    }
    mul(div(part, whole, what)?, Decimal::ONE_HUNDRED, what)
}

/// `(current - previous) / previous`. `None` without a previous value or when
/// it is zero.
pub(crate) fn relative_change(
    current: Decimal,
    previous: Option<Decimal>,
    what: &'static str,
) -> Result<Option<Decimal>, AnalyticsError> {
    match previous.filter(|p| !p.is_zero()) {
        Some(p) => Ok(Some(div(sub(current, p, what)?, p, what)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        assert!(matches!(
            add(Decimal::MAX, Decimal::ONE, "test sum"),
            Err(AnalyticsError::Overflow("test sum"))
        ));
        assert!(mul(Decimal::MAX, dec!(2), "x").is_err());
        assert!(div(dec!(-2844000), dec!(0.000000000000000000001), "x").is_err());
        assert!(sum([Decimal::MAX, Decimal::MAX], "x").is_err());
    }

    #[test]
    fn zero_divisors_are_handled_by_the_helpers() {
        assert_eq!(percent_of(dec!(5), Decimal::ZERO, "x").unwrap(), Decimal::ZERO);
        assert_eq!(relative_change(dec!(5), Some(Decimal::ZERO), "x").unwrap(), None);
        assert_eq!(relative_change(dec!(5), None, "x").unwrap(), None);
        assert_eq!(relative_change(dec!(15), Some(dec!(10)), "x").unwrap(), Some(dec!(0.5)));
    }
}
