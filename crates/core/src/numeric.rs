//! Tolerant coercion of externally-sourced numbers.
//!
//! Vendor payloads carry amounts as JSON numbers, numeric strings, formatted
//! money strings (`"$1,200.50"`, `"1.234,56 EUR"`) or sentinels such as
//! `"N/A"`. Every function here accepts that uncertainty and returns a defined
//! fallback instead of failing. Other modules must go through these helpers
//! whenever they read a number out of a payload.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Coerces a plain number or plain numeric string. Formatted money strings are
/// rejected here; use [`parse_money`] for those.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                return Some(Decimal::from(integer));
            }
            if let Some(integer) = number.as_u64() {
                return Some(Decimal::from(integer));
            }
            parse_plain(&number.to_string())
        }
        Value::String(raw) => parse_plain(raw.trim()),
        _ => None,
    }
}

pub fn safe_number(value: Option<&Value>, default: Decimal) -> Decimal {
    value.and_then(to_decimal).unwrap_or(default)
}

/// Like [`to_decimal`] but also accepts formatted money strings.
pub fn money_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(raw) => parse_money_str(raw),
        other => to_decimal(other),
    }
}

pub fn parse_money(value: Option<&Value>, default: Decimal) -> Decimal {
    value.and_then(money_value).unwrap_or(default)
}

/// Parses a money string after stripping currency symbols, ISO codes,
/// thousands separators and whitespace. `(12.50)` and `12.50-` are negative.
pub fn parse_money_str(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parenthesized = trimmed.starts_with('(') && trimmed.ends_with(')');
    let mut kept: String = trimmed
        .chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, '.' | ',' | '-'))
        .collect();

    let mut negative = parenthesized;
    if kept.ends_with('-') && kept.len() > 1 {
        kept.pop();
        negative = true;
    }
    if let Some(rest) = kept.strip_prefix('-') {
        kept = rest.to_string();
        negative = true;
    }
    if kept.is_empty() || kept.contains('-') {
        return None;
    }

    let normalized = normalize_separators(&kept)?;
    let parsed = parse_plain(&normalized)?;
    Some(if negative { -parsed } else { parsed })
}

/// `a - b` after coercing both sides, saturating at the `Decimal` bounds.
pub fn safe_difference(
    a: Option<&Value>,
    b: Option<&Value>,
    default_a: Decimal,
    default_b: Decimal,
) -> Decimal {
    safe_number(a, default_a).saturating_sub(safe_number(b, default_b))
}

/// Returns the value only when it is strictly positive.
pub fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|amount| *amount > Decimal::ZERO)
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Renders `1234.5` as `1,234.50 USD`.
pub fn format_money(amount: Decimal, currency: &str) -> String {
    let rounded = round_money(amount);
    let unsigned = format!("{:.2}", rounded.abs());
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let code = currency.trim().to_ascii_uppercase();
    if code.is_empty() {
        format!("{sign}{grouped}.{fraction}")
    } else {
        format!("{sign}{grouped}.{fraction} {code}")
    }
}

fn parse_plain(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw).ok().or_else(|| Decimal::from_scientific(raw).ok())
}

fn normalize_separators(digits: &str) -> Option<String> {
    let last_dot = digits.rfind('.');
    let last_comma = digits.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        (None, Some(comma)) => {
            let decimals = digits.len() - comma - 1;
            if digits.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                digits.replace(',', ".")
            } else {
                digits.replace(',', "")
            }
        }
        (Some(_), None) if digits.matches('.').count() > 1 => digits.replace('.', ""),
        _ => digits.to_string(),
    };

    (normalized.matches('.').count() <= 1).then_some(normalized)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        format_money, money_value, parse_money, parse_money_str, round_money, safe_difference,
        safe_number, to_decimal,
    };

    #[test]
    fn plain_numbers_and_numeric_strings_coerce() {
        assert_eq!(to_decimal(&json!(2150)), Some(Decimal::from(2150)));
        assert_eq!(to_decimal(&json!(12.5)), Some(Decimal::new(125, 1)));
        assert_eq!(to_decimal(&json!(" 42.10 ")), Some(Decimal::new(4210, 2)));
        assert_eq!(to_decimal(&json!("1e3")), Some(Decimal::from(1000)));
    }

    #[test]
    fn malformed_values_fall_back_to_default() {
        let fallback = Decimal::from(7);
        for value in [
            json!(null),
            json!("N/A"),
            json!("NaN"),
            json!("Infinity"),
            json!(true),
            json!({"amount": 10}),
            json!([1, 2]),
            json!(""),
        ] {
            assert_eq!(safe_number(Some(&value), fallback), fallback, "value: {value}");
        }
        assert_eq!(safe_number(None, fallback), fallback);
    }

    #[test]
    fn money_strings_strip_symbols_and_separators() {
        assert_eq!(parse_money_str("$1,200.50"), Some(Decimal::new(120050, 2)));
        assert_eq!(parse_money_str("USD 3 400"), Some(Decimal::from(3400)));
        assert_eq!(parse_money_str("1.234,56 EUR"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_money_str("12,5"), Some(Decimal::new(125, 1)));
        assert_eq!(parse_money_str("1,234,567"), Some(Decimal::from(1_234_567)));
        assert_eq!(parse_money_str("(45.00)"), Some(Decimal::new(-4500, 2)));
        assert_eq!(parse_money_str("45.00-"), Some(Decimal::new(-4500, 2)));
        assert_eq!(parse_money_str("No"), None);
        assert_eq!(parse_money_str("3-5"), None);
    }

    #[test]
    fn parse_money_accepts_numbers_and_defaults_on_garbage() {
        assert_eq!(parse_money(Some(&json!(99)), Decimal::ZERO), Decimal::from(99));
        assert_eq!(parse_money(Some(&json!("€ 80")), Decimal::ZERO), Decimal::from(80));
        assert_eq!(parse_money(Some(&json!("n/a")), Decimal::ONE), Decimal::ONE);
        assert_eq!(money_value(&json!({})), None);
    }

    #[test]
    fn safe_difference_coerces_both_sides() {
        let diff = safe_difference(
            Some(&json!("104")),
            Some(&json!(null)),
            Decimal::ZERO,
            Decimal::from(100),
        );
        assert_eq!(diff, Decimal::from(4));

        let clamped = safe_difference(None, None, Decimal::MAX, Decimal::MIN);
        assert_eq!(clamped, Decimal::MAX);
    }

    #[test]
    fn money_formatting_groups_thousands() {
        assert_eq!(format_money(Decimal::new(12345, 1), "usd"), "1,234.50 USD");
        assert_eq!(format_money(Decimal::new(-1_000_000, 0), "EUR"), "-1,000,000.00 EUR");
        assert_eq!(format_money(Decimal::new(5, 3), ""), "0.01");
        assert_eq!(round_money(Decimal::new(2225, 3)), Decimal::new(223, 2));
    }
}
