use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds half away from zero and renders with `dp` decimals and thousands
/// separators. The sign is left to the caller.
fn grouped_abs(value: Decimal, dp: u32) -> String {
    let rounded = value
        .abs()
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", dp as usize, rounded);
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

fn is_negative_after_rounding(value: Decimal, dp: u32) -> bool {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero) < Decimal::ZERO
}

/// Whole dollars, with negatives in accounting parentheses: `($1,234)`.
pub fn usd(value: Decimal) -> String {
    let body = format!("${}", grouped_abs(value, 0));
    if is_negative_after_rounding(value, 0) {
        format!("({body})")
    } else {
        body
    }
}

/// A figure already expressed in millions: `$8.32M`, `($1.50M)`.
pub fn usd_millions(value: Decimal) -> String {
    let body = format!("${}M", grouped_abs(value, 2));
    if is_negative_after_rounding(value, 2) {
        format!("({body})")
    } else {
        body
    }
}

/// A figure already expressed in billions: `$1.32B`.
pub fn usd_billions(value: Decimal) -> String {
    let body = format!("${}B", grouped_abs(value, 2));
    if is_negative_after_rounding(value, 2) {
        format!("({body})")
    } else {
        body
    }
}

/// A value already in percent: `12.3%`.
pub fn percent(value: Decimal) -> String {
    let sign = if is_negative_after_rounding(value, 1) { "-" } else { "" };
    format!("{sign}{}%", grouped_abs(value, 1))
}

/// A fee rate given as a fraction: `0.10` becomes `10%`.
pub fn rate(value: Decimal) -> String {
    format!("{}%", grouped_abs(value * Decimal::ONE_HUNDRED, 0))
}

/// A growth ratio as a signed percentage, or `-` when not applicable.
pub fn growth(value: Option<Decimal>) -> String {
    match value {
        None => "-".to_string(),
        Some(ratio) => {
            let pct = ratio * Decimal::ONE_HUNDRED;
            let sign = if is_negative_after_rounding(pct, 1) { "-" } else { "+" };
            format!("{sign}{}%", grouped_abs(pct, 1))
        }
    }
}

/// A plain number with thousands separators.
pub fn number(value: Decimal, dp: u32) -> String {
    let sign = if is_negative_after_rounding(value, dp) { "-" } else { "" };
    format!("{sign}{}", grouped_abs(value, dp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn dollars_are_grouped_and_parenthesised() {
        assert_eq!(usd(dec!(1234567.4)), "$1,234,567");
        assert_eq!(usd(dec!(999.5)), "$1,000");
        assert_eq!(usd(dec!(-947700)), "($947,700)");
        assert_eq!(usd(Decimal::ZERO), "$0");
        assert_eq!(usd(dec!(-0.4)), "$0");
    }

    #[test]
    fn scaled_units() {
        assert_eq!(usd_millions(dec!(8.32)), "$8.32M");
        assert_eq!(usd_millions(dec!(-1.5)), "($1.50M)");
        assert_eq!(usd_billions(dec!(1.716)), "$1.72B");
    }

    #[test]
    fn percentages_and_rates() {
        assert_eq!(percent(dec!(32.3317)), "32.3%");
        assert_eq!(percent(dec!(-31590)), "-31,590.0%");
        assert_eq!(rate(dec!(0.10)), "10%");
        assert_eq!(rate(dec!(0.05)), "5%");
    }

    #[test]
    fn growth_has_a_placeholder_for_the_first_period() {
        assert_eq!(growth(None), "-");
        assert_eq!(growth(Some(dec!(0.5))), "+50.0%");
        assert_eq!(growth(Some(dec!(-0.25))), "-25.0%");
    }

    #[test]
    fn plain_numbers() {
        assert_eq!(number(dec!(1234.5678), 2), "1,234.57");
        assert_eq!(number(dec!(-12), 0), "-12");
    }
}
