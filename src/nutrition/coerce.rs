//! Permissive numeric input. Forms and JSON bodies may carry blanks, strings
//! or garbage where numbers are expected; those become 0 instead of a 4xx.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Whole kilocalories; fractional input is truncated.
pub fn coerce_calories(raw: &str) -> i32 {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i32>() {
        return v.max(0);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc().clamp(0.0, i32::MAX as f64) as i32,
        _ => 0,
    }
}

pub fn coerce_amount(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v.max(0.0),
        _ => 0.0,
    }
}

/// `None` for null or a blank string, 0 for anything that is not a number.
/// Sign is kept.
fn loose_number(v: &Value) -> Option<f64> {
    match v {
        Value::Null => None,
        Value::Number(n) => Some(n.as_f64().filter(|f| f.is_finite()).unwrap_or(0.0)),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .unwrap_or(0.0),
        ),
        _ => Some(0.0),
    }
}

fn to_whole(v: f64) -> i32 {
    v.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

/// Blank keeps the current value; malformed becomes 0.
pub fn opt_whole<'de, D>(d: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(loose_number(&v).map(to_whole))
}

/// Blank keeps the current value; malformed becomes 0.
pub fn opt_amount<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(loose_number(&v))
}

/// Blank and malformed both become 0.
pub fn whole<'de, D>(d: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(loose_number(&v).map(to_whole).unwrap_or(0))
}
