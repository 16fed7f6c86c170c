use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// For USD, 1 unit = 100 cents, so $50.00 = 5000 cents.
pub type Cents = i64;

/// Largest magnitude accepted for a single amount or balance (one trillion units).
/// Keeps sums far from `i64` overflow and every amount exact as an `f64` on the wire.
pub const MAX_CENTS: Cents = 100_000_000_000_000;

/// Whether `cents` lies within `-MAX_CENTS..=MAX_CENTS`.
pub fn within_limit(cents: Cents) -> bool {
    cents.unsigned_abs() <= MAX_CENTS.unsigned_abs()
}

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (digits, ""),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.bytes().all(|b| b.is_ascii_digit())
        || !decimal_str.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::Overflow)?
    };

    // Pad or truncate the fractional part to exactly two digits
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => i64::from(decimal_str.as_bytes()[0] - b'0') * 10,
        _ => decimal_str[..2]
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .filter(|c| *c <= MAX_CENTS)
        .ok_or(ParseCentsError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

/// Parse an amount typed by a user, tolerating currency formatting.
/// Dollar signs, thousands separators and whitespace are removed first,
/// so "$1,250.50" and " 1 250.50 " both parse to 125050.
pub fn parse_user_amount(input: &str) -> Result<Cents, ParseCentsError> {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    parse_cents(&cleaned)
}

/// Convert a floating-point currency amount (as found in stored JSON) to cents.
pub fn cents_from_units(units: f64) -> Option<Cents> {
    if !units.is_finite() {
        return None;
    }
    let cents = (units * 100.0).round();
    if cents.abs() > MAX_CENTS as f64 {
        return None;
    }
    Some(cents as Cents)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter storing cents as decimal currency units (`12.5` for 1250).
///
/// Decoding is lenient: numbers and numeric strings (with `$`/`,` formatting)
/// are accepted, anything else decodes as zero.
pub mod units {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use super::{Cents, cents_from_units, parse_user_amount};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        if cents % 100 == 0 {
            serializer.serialize_i64(cents / 100)
        } else {
            serializer.serialize_f64(*cents as f64 / 100.0)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(from_value(&value).unwrap_or(0))
    }

    /// Coerce a JSON value into cents, if it looks like an amount.
    pub fn from_value(value: &Value) -> Option<Cents> {
        match value {
            Value::Number(n) => n.as_f64().and_then(cents_from_units),
            Value::String(s) => parse_user_amount(s).ok(),
            _ => None,
        }
    }
}
