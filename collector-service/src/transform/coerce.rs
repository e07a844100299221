//! Scalar coercion for loosely typed upstream values.
//!
//! Every helper falls back to zero instead of failing: upstream sources omit or
//! garble individual fields often enough that one bad cell must not drop a row.

use serde_json::{Map, Value};

/// Numeric JSON value, or `0.0` for anything else (strings included).
pub fn number_or_zero(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

/// Field `key` of a JSON object as a number, see [`number_or_zero`].
pub fn field_or_zero(map: &Map<String, Value>, key: &str) -> f64 {
    number_or_zero(map.get(key))
}

/// Numeric JSON value or numeric string, else `0.0`.
pub fn lenient_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_f64_or_zero(s),
        _ => 0.0,
    }
}

/// Decimal text with optional `,` thousands separators, else `0.0`.
///
/// Non-finite spellings (`NaN`, `inf`) count as unparseable.
pub fn parse_f64_or_zero(s: &str) -> f64 {
    let cleaned = s.trim().replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Base-10 integer text, else `0`.
pub fn parse_i32_or_zero(s: &str) -> i32 {
    s.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thousands_separators_are_removed() {
        assert_eq!(parse_f64_or_zero("1,234.5"), 1234.5);
        assert_eq!(parse_f64_or_zero("12,345,678"), 12_345_678.0);
    }

    #[test]
    fn garbage_floats_become_zero() {
        assert_eq!(parse_f64_or_zero(""), 0.0);
        assert_eq!(parse_f64_or_zero("-"), 0.0);
        assert_eq!(parse_f64_or_zero("n/a"), 0.0);
        assert_eq!(parse_f64_or_zero("NaN"), 0.0);
        assert_eq!(parse_f64_or_zero("inf"), 0.0);
    }

    #[test]
    fn integers_parse_or_default() {
        assert_eq!(parse_i32_or_zero("23"), 23);
        assert_eq!(parse_i32_or_zero(" 7 "), 7);
        assert_eq!(parse_i32_or_zero("1.5"), 0);
        assert_eq!(parse_i32_or_zero("hour"), 0);
        assert_eq!(parse_i32_or_zero("99999999999"), 0);
    }

    #[test]
    fn strict_number_rejects_strings() {
        let data = json!({ "a": 3, "b": "3", "c": null, "d": 2.5 });
        let map = data.as_object().unwrap();

        assert_eq!(field_or_zero(map, "a"), 3.0);
        assert_eq!(field_or_zero(map, "b"), 0.0);
        assert_eq!(field_or_zero(map, "c"), 0.0);
        assert_eq!(field_or_zero(map, "d"), 2.5);
        assert_eq!(field_or_zero(map, "missing"), 0.0);
    }

    #[test]
    fn lenient_accepts_numeric_strings() {
        assert_eq!(lenient_f64(Some(&json!("4,200.25"))), 4200.25);
        assert_eq!(lenient_f64(Some(&json!(17))), 17.0);
        assert_eq!(lenient_f64(Some(&json!(true))), 0.0);
        assert_eq!(lenient_f64(Some(&json!({ "nested": 1 }))), 0.0);
        assert_eq!(lenient_f64(None), 0.0);
    }
}
