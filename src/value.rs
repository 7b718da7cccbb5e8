use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Scalar value: always a string, with a numeric meaning derived on demand
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Value(String);

impl Value {
    /// Create a value from a number, using its canonical string form
    #[inline]
    pub fn from_number(n: f64) -> Self {
        Value(format_number(n))
    }

    /// Create a boolean result: "1" or "0"
    #[inline]
    pub fn from_bool(b: bool) -> Self {
        Value(if b { "1" } else { "0" }.to_string())
    }

    /// The value a missing variable or array element reads as
    pub fn unset() -> Self {
        Value("0".to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Numeric meaning; anything that isn't a well-formed number is 0
    #[inline]
    pub fn to_number(&self) -> f64 {
        parse_number(&self.0).unwrap_or(0.0)
    }

    /// Numeric meaning, if the whole string is a number
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        parse_number(&self.0)
    }

    /// Check if this value is "true" in a boolean context:
    /// false exactly when it reads as the number 0
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self.as_number(), Some(n) if n == 0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(s)
    }
}

/// A named cell in a scope: a name is either a scalar or an array
#[derive(Debug, Clone)]
pub enum Variable {
    Scalar(Value),
    Array(HashMap<String, Value>),
}

/// Compare two values: numerically when both parse as numbers,
/// otherwise as strings
#[inline]
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.as_str().cmp(right.as_str()),
    }
}

/// Parse a string that is entirely a decimal number (surrounding whitespace
/// allowed): optional sign, digits with at most one point, optional exponent.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Fast path: simple integer
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse().ok();
    }

    let body = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);

    let bytes = body.as_bytes();
    let mut i = 0;
    let mut digits = 0;

    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }

    if i != bytes.len() {
        return None;
    }

    trimmed.parse().ok()
}

/// Canonical string form of a number: at most five digits after the point,
/// with trailing zeros (and a bare trailing point) removed
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Integers print without a fractional part
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let int = n as i64;
        return int.to_string();
    }

    let s = format!("{:.5}", n);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_round_trip_through_string() {
        assert_eq!(Value::from_number(42.0).as_str(), "42");
        assert_eq!(Value::from_number(2.5).as_str(), "2.5");
        assert_eq!(Value::from_number(1.0 / 3.0).as_str(), "0.33333");
        assert_eq!(Value::from_number(2.0 / 3.0).as_str(), "0.66667");
        assert_eq!(Value::from_number(-0.000001).as_str(), "0");
        assert_eq!(Value::from_number(-0.0).as_str(), "0");
        assert_eq!(Value::from_number(-7.25).as_str(), "-7.25");
        assert_eq!(Value::from_number(1e20).as_str(), "100000000000000000000");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from("42").to_number(), 42.0);
        assert_eq!(Value::from(" 3.14 ").to_number(), 3.14);
        assert_eq!(Value::from("-5.5").to_number(), -5.5);
        assert_eq!(Value::from("1e3").to_number(), 1000.0);
        assert_eq!(Value::from(".5").to_number(), 0.5);
        assert_eq!(Value::from("abc").to_number(), 0.0);
        assert_eq!(Value::from("42abc").to_number(), 0.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::from("inf").to_number(), 0.0);
        assert_eq!(Value::from("1e").to_number(), 0.0);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::from("0").is_truthy());
        assert!(!Value::from("0.0").is_truthy());
        assert!(!Value::from_bool(false).is_truthy());
        assert!(Value::from("1").is_truthy());
        assert!(Value::from("abc").is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(!Value::unset().is_truthy());
    }

    #[test]
    fn test_comparison() {
        // Both numeric -> compare numerically
        assert_eq!(compare_values(&"10".into(), &"2".into()), Ordering::Greater);
        assert_eq!(compare_values(&"5".into(), &"5.0".into()), Ordering::Equal);

        // Either side non-numeric -> compare as strings
        assert_eq!(compare_values(&"abc".into(), &"abd".into()), Ordering::Less);
        assert_eq!(compare_values(&"10".into(), &"9x".into()), Ordering::Less);
    }
}
